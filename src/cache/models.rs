//! Cache configuration, key, and statistics models.

// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Separator between the segments of a serialized [`CacheKey`].
pub const KEY_SEPARATOR: char = '|';

/// Configuration for the cache-aside layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cache entry in seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Minimum similarity (0-100) for a fuzzy hit.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Maximum number of live entries; `0` means unbounded.
    #[serde(default)]
    pub max_entries: usize,
    /// Hard cap on candidate keys examined per fuzzy lookup.
    #[serde(default = "default_fuzzy_scan_limit")]
    pub fuzzy_scan_limit: usize,
    /// Batch size hint passed to each scan call.
    #[serde(default = "default_fuzzy_scan_count")]
    pub fuzzy_scan_count: usize,
}

impl Default for CacheConfig {
    /// Provides default values for cache configuration.
    ///
    /// - `ttl_seconds`: 3600
    /// - `fuzzy_threshold`: 75
    /// - `max_entries`: 0 (unbounded)
    /// - `fuzzy_scan_limit`: 500
    /// - `fuzzy_scan_count`: 100
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            fuzzy_threshold: default_fuzzy_threshold(),
            max_entries: 0,
            fuzzy_scan_limit: default_fuzzy_scan_limit(),
            fuzzy_scan_count: default_fuzzy_scan_count(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_fuzzy_threshold() -> f64 {
    75.0
}

fn default_fuzzy_scan_limit() -> usize {
    500
}

fn default_fuzzy_scan_count() -> usize {
    100
}

/// Composite key of a cached search result.
///
/// Serialized as `"<query>|<page_size>|<language>"`. The query segment is
/// already normalized and may itself contain the separator, so parsing
/// splits from the right.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub page_size: u32,
    pub language: String,
}

impl CacheKey {
    pub fn new(query: impl Into<String>, page_size: u32, language: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size,
            language: language.into(),
        }
    }

    /// Parse a serialized key. Returns `None` for keys that are not search
    /// entries (counters, malformed page sizes).
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.rsplitn(3, KEY_SEPARATOR);
        let language = parts.next()?;
        let page_size = parts.next()?.parse().ok()?;
        let query = parts.next()?;
        Some(Self::new(query, page_size, language))
    }

    /// Glob pattern selecting cached queries that contain `token` and share
    /// this key's page size and language.
    pub fn candidate_pattern(token: Option<&str>, page_size: u32, language: &str) -> String {
        match token {
            Some(token) if !token.is_empty() => format!(
                "*{token}*{sep}{page_size}{sep}{language}",
                sep = KEY_SEPARATOR
            ),
            _ => format!("*{sep}{page_size}{sep}{language}", sep = KEY_SEPARATOR),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.query,
            self.page_size,
            self.language,
            sep = KEY_SEPARATOR
        )
    }
}

/// Point-in-time view of a cache store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Live entries, counters included.
    pub entry_count: usize,
    /// Rough memory footprint of keys, values, and bookkeeping.
    pub approx_memory_bytes: usize,
    /// Default entry lifetime.
    pub ttl_seconds: u64,
    /// Capacity bound (`0` = unbounded).
    pub max_entries: usize,
}

/// Aggregate statistics reported to the agent by `get_cache_stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: usize,
    pub max_entries: usize,
    #[serde(rename = "approxMemoryMB")]
    pub approx_memory_mb: f64,
    pub ttl_seconds: u64,
    pub hits_exact: u64,
    pub hits_fuzzy: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
    pub api_requests_total: u64,
    pub fuzzy_threshold: f64,
}
