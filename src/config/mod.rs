// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{DocSearchError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

/// Flat operational variables and the config keys they override.
///
/// `MAX_RETRIES` counts total fetch attempts. The model policy counts
/// retries after the first call and has its own `MODEL_*` variables.
const FLAT_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("CACHE_TTL_SECONDS", "cache.ttl_seconds"),
    ("FUZZY_THRESHOLD", "cache.fuzzy_threshold"),
    ("CACHE_MAX_ENTRIES", "cache.max_entries"),
    ("FUZZY_SCAN_LIMIT", "cache.fuzzy_scan_limit"),
    ("FUZZY_SCAN_COUNT", "cache.fuzzy_scan_count"),
    ("MAX_RETRIES", "retry.max_retries"),
    ("MODEL_MAX_RETRIES", "model_retry.max_retries"),
    ("MODEL_INITIAL_DELAY_MS", "model_retry.initial_delay_ms"),
    ("MODEL_BACKOFF_FACTOR", "model_retry.backoff_factor"),
    ("DEFAULT_PAGE_SIZE", "search.default_page_size"),
    ("MAX_PAGE_SIZE", "search.max_page_size"),
    ("DOCS_SEARCH_API_URL", "search.api_url"),
    ("DOCS_SEARCH_API_KEY", "search.api_key"),
];

impl AppConfig {
    /// Load configuration from the default config file location.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from multiple sources with precedence:
    /// 1. Flat operational env vars such as `CACHE_TTL_SECONDS` (highest)
    /// 2. Prefixed env vars (`DOCSEARCH__CACHE__TTL_SECONDS`)
    /// 3. Config file (explicit path, or `~/.docsearch-cache/config.toml`)
    /// 4. Defaults (lowest)
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("DOCSEARCH")
                    .prefix_separator("__")
                    .separator("__"),
            );

        for (var, key) in FLAT_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let config: AppConfig = builder
            .build()
            .map_err(|e| DocSearchError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| DocSearchError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the cache and retry layers cannot operate with.
    ///
    /// Missing search credentials are not checked here; they only matter
    /// when a [`crate::search::SearchClient`] is constructed.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.cache.fuzzy_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(DocSearchError::Config(format!(
                "fuzzy_threshold must be within 0..=100, got {}",
                threshold
            )));
        }
        if self.search.max_page_size == 0 {
            return Err(DocSearchError::Config(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        if self.search.default_page_size == 0
            || self.search.default_page_size > self.search.max_page_size
        {
            return Err(DocSearchError::Config(format!(
                "default_page_size {} must be within 1..={}",
                self.search.default_page_size, self.search.max_page_size
            )));
        }
        if self.retry.max_retries == 0 {
            return Err(DocSearchError::Config(
                "retry.max_retries counts total attempts and must be at least 1".to_string(),
            ));
        }
        if self.model_retry.backoff_factor < 1.0 {
            return Err(DocSearchError::Config(format!(
                "model_retry.backoff_factor must be >= 1.0, got {}",
                self.model_retry.backoff_factor
            )));
        }
        Ok(())
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docsearch-cache")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
