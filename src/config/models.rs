//! Configuration data structures for docsearch-cache.
//!
//! This module defines the schema for the application settings: the HTTP
//! surface, the upstream documentation search service, the cache, and the
//! two retry policies (search fetches and model calls).
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::cache::CacheConfig;
use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream documentation search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Cache-aside layer settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry policy for search fetches.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Retry policy for language-model invocations.
    #[serde(default)]
    pub model_retry: ModelRetryConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of tokio worker threads.
    /// Default: Number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Settings for the upstream documentation search service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint URL. Required.
    #[serde(default)]
    pub api_url: String,

    /// Bearer API key for the search endpoint. Required.
    #[serde(default)]
    pub api_key: String,

    /// Base URL prepended to each hit's `path` when rendering links.
    /// Default: `https://docs.example.com`
    #[serde(default = "default_link_base_url")]
    pub link_base_url: String,

    /// Page size used when the caller does not ask for one.
    /// Default: `5`
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest page size a caller may request.
    /// Default: `20`
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Language filter used when the caller does not pass one.
    /// Default: `python`
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Per-attempt request timeout in seconds.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Retry settings for the search fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts per fetch (not additional retries).
    /// Default: `3`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds.
    /// Default: `500`
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Retry settings for model invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    /// Default: `2`
    #[serde(default = "default_model_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    /// Default: `1000`
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Multiplier applied to the delay after every retry.
    /// Default: `2.0`
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound for a single delay in milliseconds.
    /// Default: `30000`
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Finish reasons that mark a response as malformed and worth retrying.
    /// Default: `["MALFORMED_FUNCTION_CALL"]`
    #[serde(default = "default_retryable_finish_reasons")]
    pub retryable_finish_reasons: Vec<String>,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to mask API keys and bearer tokens in logged upstream bodies.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub sanitize_secrets: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            link_base_url: default_link_base_url(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            default_language: default_language(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for ModelRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_model_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            retryable_finish_reasons: default_retryable_finish_reasons(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            sanitize_secrets: true,
        }
    }
}

// Helper functions for serde defaults
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_link_base_url() -> String {
    "https://docs.example.com".to_string()
}

fn default_page_size() -> u32 {
    5
}

fn default_max_page_size() -> u32 {
    20
}

fn default_language() -> String {
    "python".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_model_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_retryable_finish_reasons() -> Vec<String> {
    vec!["MALFORMED_FUNCTION_CALL".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
