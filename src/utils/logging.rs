//! Structured logging and secret-scrubbing utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing a helper that keeps
//! search API credentials out of logged upstream error bodies.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{DocSearchError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line human-readable output.
/// - `pretty` (default): Multi-line, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| DocSearchError::Internal(format!("Failed to init logging: {}", e)))
}

/// Sanitizes sensitive information from log messages.
///
/// Replaces every `Bearer <token>` credential and every occurrence of the
/// configured API key (when non-empty) with a `\[REDACTED\]` placeholder.
pub fn sanitize(input: &str, api_key: &str) -> String {
    let mut result = input.to_string();

    if !api_key.is_empty() {
        result = result.replace(api_key, "[REDACTED_API_KEY]");
    }

    let mut search_from = 0;
    while let Some(pos) = result[search_from..].find("Bearer ") {
        let start = search_from + pos + "Bearer ".len();
        let end = result[start..]
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'')
            .map(|i| start + i)
            .unwrap_or(result.len());
        if start == end {
            search_from = start;
            continue;
        }
        result.replace_range(start..end, "[REDACTED_TOKEN]");
        search_from = start + "[REDACTED_TOKEN]".len();
    }

    result
}
