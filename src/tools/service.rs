// Documentation search service backing the agent tools
// Author: kelexine (https://github.com/kelexine)

use super::{ToolError, ToolResult};
use crate::cache::{CacheManager, CacheStats, CacheStore, MemoryStore};
use crate::config::{AppConfig, SearchConfig};
use crate::error::Result;
use crate::metrics::{MetricsReporter, PrometheusMetrics};
use crate::search::{RetryableFetcher, SearchBackend};
use crate::utils::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Request-level validation and defaults in front of the [`CacheManager`].
pub struct DocSearchService {
    cache: Arc<CacheManager>,
    default_page_size: u32,
    max_page_size: u32,
    default_language: String,
}

impl DocSearchService {
    pub fn new(cache: Arc<CacheManager>, search: &SearchConfig) -> Self {
        Self {
            cache,
            default_page_size: search.default_page_size,
            max_page_size: search.max_page_size,
            default_language: search.default_language.clone(),
        }
    }

    /// Wire an in-memory store, counters, fetcher, and cache manager from
    /// configuration around the given search backend.
    pub fn from_config(
        config: &AppConfig,
        backend: Arc<dyn SearchBackend>,
        exporter: Option<Arc<PrometheusMetrics>>,
    ) -> Self {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(&config.cache));

        let mut metrics = MetricsReporter::new(store.clone());
        if let Some(exporter) = exporter {
            metrics = metrics.with_exporter(exporter);
        }

        let fetcher = Arc::new(RetryableFetcher::new(
            backend,
            metrics.clone(),
            RetryPolicy::from_fetch_config(&config.retry),
            Duration::from_secs(config.search.timeout_seconds),
            config.search.link_base_url.clone(),
        ));

        let cache = Arc::new(CacheManager::new(
            config.cache.clone(),
            store,
            metrics,
            fetcher,
        ));

        Self::new(cache, &config.search)
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Search the documentation through the cache.
    ///
    /// Never fails: bad arguments and exhausted fetches come back as
    /// [`ToolResult::Error`].
    pub async fn search_docs(
        &self,
        query: &str,
        page_size: Option<u32>,
        version: Option<&str>,
        language: Option<&str>,
    ) -> ToolResult {
        let page_size = page_size.unwrap_or(self.default_page_size);
        if page_size == 0 || page_size > self.max_page_size {
            return ToolResult::Error(
                ToolError::invalid_request(format!(
                    "page_size must be between 1 and {}",
                    self.max_page_size
                ))
                .with_details(format!("got {}", page_size)),
            );
        }

        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_language);
        let version = version.map(str::trim).filter(|v| !v.is_empty());

        match self.cache.resolve(query, page_size, language, version).await {
            Ok(resolved) => {
                debug!(
                    "search_docs {:?} served via {}",
                    query,
                    resolved.outcome.as_str()
                );
                ToolResult::Success(resolved.text)
            }
            Err(failure) => ToolResult::Error(failure.into()),
        }
    }

    pub async fn get_cache_stats(&self) -> Result<CacheStats> {
        self.cache.stats().await
    }

    /// Remove all cached results and reset the counters.
    pub async fn clear_cache(&self) -> Result<()> {
        let removed = self.cache.clear().await?;
        info!("clear_cache removed {} entries", removed);
        Ok(())
    }
}
