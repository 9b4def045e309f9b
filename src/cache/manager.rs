// Cache manager - cache-aside lookup in front of the documentation search
// Author: kelexine (https://github.com/kelexine)

use crate::cache::fuzzy::{FuzzyMatch, FuzzyMatcher};
use crate::cache::models::{CacheConfig, CacheKey, CacheStats};
use crate::cache::normalize::normalize;
use crate::cache::store::CacheStore;
use crate::error::Result;
use crate::metrics::{Counter, MetricsReporter};
use crate::search::{FetchFailure, RetryableFetcher};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a resolved value was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Exact,
    Fuzzy { key: String, score: f64 },
    Fetched,
}

impl LookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupOutcome::Exact => "exact",
            LookupOutcome::Fuzzy { .. } => "fuzzy",
            LookupOutcome::Fetched => "fetched",
        }
    }
}

/// A search result together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub text: String,
    pub outcome: LookupOutcome,
}

/// Cache-aside orchestrator: exact lookup, then fuzzy lookup with
/// promotion, then a retried fetch whose result is stored.
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    metrics: MetricsReporter,
    fetcher: Arc<RetryableFetcher>,
    matcher: FuzzyMatcher,
    config: CacheConfig,
}

impl CacheManager {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn CacheStore>,
        metrics: MetricsReporter,
        fetcher: Arc<RetryableFetcher>,
    ) -> Self {
        Self {
            matcher: FuzzyMatcher::new(config.fuzzy_threshold),
            store,
            metrics,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsReporter {
        &self.metrics
    }

    /// Resolve a search through the cache.
    ///
    /// Store failures are treated as misses. Only an exhausted fetch yields
    /// `Err`, carrying the structured error for the agent.
    pub async fn resolve(
        &self,
        query: &str,
        page_size: u32,
        language: &str,
        version: Option<&str>,
    ) -> std::result::Result<Resolved, FetchFailure> {
        let normalized = normalize(query);
        let exact_key = CacheKey::new(normalized.as_str(), page_size, language).to_string();

        match self.store.get(&exact_key).await {
            Ok(Some(text)) => {
                debug!("Exact cache hit for {:?}", exact_key);
                self.metrics.incr(Counter::HitsExact).await;
                return Ok(Resolved {
                    text,
                    outcome: LookupOutcome::Exact,
                });
            }
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {:?}, treating as miss: {}", exact_key, e),
        }

        match self.fuzzy_lookup(&normalized, page_size, language, &exact_key).await {
            Ok(Some(resolved)) => return Ok(resolved),
            Ok(None) => {}
            Err(e) => warn!("Fuzzy lookup failed, treating as miss: {}", e),
        }

        self.metrics.incr(Counter::Misses).await;
        debug!("Cache miss for {:?}, fetching", exact_key);

        let text = self.fetcher.fetch(query, page_size, language, version).await?;

        if let Err(e) = self.store.set(&exact_key, &text, Some(self.config.ttl())).await {
            warn!("Failed to cache result for {:?}: {}", exact_key, e);
        }
        self.refresh_entry_gauge().await;

        Ok(Resolved {
            text,
            outcome: LookupOutcome::Fetched,
        })
    }

    /// Find the best cached query with the same page size and language and,
    /// if it clears the threshold, promote its value to `exact_key`.
    async fn fuzzy_lookup(
        &self,
        normalized: &str,
        page_size: u32,
        language: &str,
        exact_key: &str,
    ) -> Result<Option<Resolved>> {
        let Some(best) = self.best_candidate(normalized, page_size, language).await? else {
            return Ok(None);
        };

        if !self.matcher.accepts(best.score) {
            debug!(
                "Best fuzzy candidate {:?} scored {:.1}, below threshold {}",
                best.key,
                best.score,
                self.matcher.threshold()
            );
            return Ok(None);
        }

        // The candidate may have expired since the scan
        let Some(text) = self
            .store
            .copy(&best.key, exact_key, Some(self.config.ttl()))
            .await?
        else {
            debug!("Fuzzy candidate {:?} vanished before promotion", best.key);
            return Ok(None);
        };

        info!(
            "Fuzzy cache hit: {:?} -> {:?} (score {:.1})",
            exact_key, best.key, best.score
        );
        self.metrics.incr(Counter::HitsFuzzy).await;
        self.refresh_entry_gauge().await;

        Ok(Some(Resolved {
            text,
            outcome: LookupOutcome::Fuzzy {
                key: best.key,
                score: best.score,
            },
        }))
    }

    /// Scan for candidate keys, examining at most `fuzzy_scan_limit` of them.
    async fn best_candidate(
        &self,
        normalized: &str,
        page_size: u32,
        language: &str,
    ) -> Result<Option<FuzzyMatch>> {
        let pattern =
            CacheKey::candidate_pattern(normalized.split_whitespace().next(), page_size, language);
        let limit = self.config.fuzzy_scan_limit;

        let mut candidates: Vec<(String, String)> = Vec::new();
        let mut examined = 0usize;
        let mut cursor = 0u64;

        loop {
            let (next, keys) = self
                .store
                .scan(cursor, &pattern, self.config.fuzzy_scan_count)
                .await?;

            for raw in keys {
                if examined >= limit {
                    break;
                }
                examined += 1;

                let Some(key) = CacheKey::parse(&raw) else {
                    continue;
                };
                if key.page_size != page_size || key.language != language {
                    continue;
                }
                candidates.push((raw, key.query));
            }

            if next == 0 || examined >= limit {
                break;
            }
            cursor = next;
        }

        debug!(
            "Fuzzy scan {:?} examined {} keys, {} candidates",
            pattern,
            examined,
            candidates.len()
        );

        Ok(self.matcher.best_match(normalized, candidates))
    }

    async fn refresh_entry_gauge(&self) {
        if let Some(exporter) = self.metrics.exporter() {
            if let Ok(size) = self.store.size().await {
                exporter.set_cache_entries(size);
            }
        }
    }

    /// Aggregate store and counter statistics.
    pub async fn stats(&self) -> Result<CacheStats> {
        let store = self.store.stats().await?;
        let counters = self.metrics.snapshot().await;

        let total_requests = counters.hits_exact + counters.hits_fuzzy + counters.misses;
        let hit_rate_percent = if total_requests > 0 {
            let hits = (counters.hits_exact + counters.hits_fuzzy) as f64;
            (hits / total_requests as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        let approx_memory_mb =
            (store.approx_memory_bytes as f64 / (1024.0 * 1024.0) * 1000.0).round() / 1000.0;

        Ok(CacheStats {
            entry_count: store.entry_count,
            max_entries: store.max_entries,
            approx_memory_mb,
            ttl_seconds: store.ttl_seconds,
            hits_exact: counters.hits_exact,
            hits_fuzzy: counters.hits_fuzzy,
            misses: counters.misses,
            total_requests,
            hit_rate_percent,
            api_requests_total: counters.api_requests_total,
            fuzzy_threshold: self.matcher.threshold(),
        })
    }

    /// Drop every entry and counter.
    pub async fn clear(&self) -> Result<usize> {
        let removed = self.store.clear().await?;
        info!("Cleared {} cache entries", removed);
        self.refresh_entry_gauge().await;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::error::DocSearchError;
    use crate::search::{HitMetadata, SearchBackend, SearchHit, SearchRequest};
    use crate::utils::retry::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Answers every query with a single hit titled after the query.
    struct CountingBackend {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl SearchBackend for CountingBackend {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DocSearchError::SearchApi("HTTP 500: down".to_string()));
            }
            Ok(vec![SearchHit {
                path: "/guides/middleware".to_string(),
                metadata: HitMetadata {
                    title: request.query.clone(),
                },
                content: "Register middleware on the app.".to_string(),
            }])
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<()> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn copy(
            &self,
            _source: &str,
            _destination: &str,
            _ttl: Option<Duration>,
        ) -> Result<Option<String>> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn ttl(&self, _key: &str) -> Result<i64> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn incr(&self, _key: &str, _amount: i64) -> Result<i64> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn scan(&self, _cursor: u64, _pattern: &str, _count: usize) -> Result<(u64, Vec<String>)> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn clear(&self) -> Result<usize> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn size(&self) -> Result<usize> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
        async fn stats(&self) -> Result<crate::cache::StoreStats> {
            Err(DocSearchError::CacheStore("unreachable".to_string()))
        }
    }

    fn manager_with(
        store: Arc<dyn CacheStore>,
        config: CacheConfig,
        fail: bool,
    ) -> (CacheManager, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend {
            calls: AtomicU32::new(0),
            fail,
        });
        let metrics = MetricsReporter::new(store.clone());
        let fetcher = Arc::new(RetryableFetcher::new(
            backend.clone(),
            metrics.clone(),
            RetryPolicy::fixed(3, Duration::from_millis(500)),
            Duration::from_secs(30),
            "https://docs.example.com",
        ));
        (CacheManager::new(config, store, metrics, fetcher), backend)
    }

    fn manager(fail: bool) -> (CacheManager, Arc<CountingBackend>, Arc<MemoryStore>) {
        let config = CacheConfig::default();
        let store = Arc::new(MemoryStore::new(&config));
        let (manager, backend) = manager_with(store.clone(), config, fail);
        (manager, backend, store)
    }

    #[tokio::test]
    async fn test_exact_hit_skips_fetch() {
        let (manager, backend, _) = manager(false);

        let first = manager.resolve("Auth Config", 5, "python", None).await.unwrap();
        assert_eq!(first.outcome, LookupOutcome::Fetched);

        let second = manager.resolve("auth   config", 5, "python", None).await.unwrap();
        assert_eq!(second.outcome, LookupOutcome::Exact);
        assert_eq!(second.text, first.text);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.hits_exact, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_fuzzy_hit_promotes_to_exact_key() {
        let (manager, backend, store) = manager(false);

        let fetched = manager
            .resolve("how do I add middleware?", 5, "python", None)
            .await
            .unwrap();
        assert!(store.exists("how do i add middleware?|5|python").await.unwrap());

        let fuzzy = manager
            .resolve("middleware setup examples", 5, "python", None)
            .await
            .unwrap();
        match &fuzzy.outcome {
            LookupOutcome::Fuzzy { key, score } => {
                assert_eq!(key, "how do i add middleware?|5|python");
                assert!(*score >= 75.0);
            }
            other => panic!("expected fuzzy hit, got {:?}", other),
        }
        assert_eq!(fuzzy.text, fetched.text);
        assert!(store.exists("middleware setup examples|5|python").await.unwrap());

        let exact = manager
            .resolve("middleware setup examples", 5, "python", None)
            .await
            .unwrap();
        assert_eq!(exact.outcome, LookupOutcome::Exact);

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.hits_fuzzy, 1);
        assert_eq!(stats.hits_exact, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.api_requests_total, 1);
    }

    #[tokio::test]
    async fn test_fuzzy_requires_same_page_size_and_language() {
        let (manager, backend, _) = manager(false);

        manager.resolve("middleware setup", 5, "python", None).await.unwrap();
        let other_size = manager.resolve("middleware setup", 10, "python", None).await.unwrap();
        let other_lang = manager.resolve("middleware setup", 5, "rust", None).await.unwrap();

        assert_eq!(other_size.outcome, LookupOutcome::Fetched);
        assert_eq!(other_lang.outcome, LookupOutcome::Fetched);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unrelated_query_misses() {
        let (manager, backend, _) = manager(false);

        manager.resolve("middleware setup", 5, "python", None).await.unwrap();
        let resolved = manager.resolve("database migrations", 5, "python", None).await.unwrap();

        assert_eq!(resolved.outcome, LookupOutcome::Fetched);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scan_limit_bounds_candidates() {
        let config = CacheConfig {
            fuzzy_scan_limit: 0,
            ..CacheConfig::default()
        };
        let store = Arc::new(MemoryStore::new(&config));
        let (manager, backend) = manager_with(store, config, false);

        manager.resolve("middleware setup", 5, "python", None).await.unwrap();
        let resolved = manager.resolve("middleware setup guide", 5, "python", None).await.unwrap();

        assert_eq!(resolved.outcome, LookupOutcome::Fetched);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_returns_structured_error() {
        let (manager, backend, store) = manager(true);

        let failure = manager.resolve("routing", 5, "python", None).await.unwrap_err();

        assert!(!failure.error.is_empty());
        assert_eq!(failure.query, "routing");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(!store.exists("routing|5|python").await.unwrap());
    }

    #[tokio::test]
    async fn test_broken_store_fails_open() {
        let (manager, backend) =
            manager_with(Arc::new(BrokenStore), CacheConfig::default(), false);

        let resolved = manager.resolve("routing", 5, "python", None).await.unwrap();

        assert_eq!(resolved.outcome, LookupOutcome::Fetched);
        assert!(resolved.text.contains("Title: routing"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_counters() {
        let (manager, _, _) = manager(false);

        manager.resolve("routing", 5, "python", None).await.unwrap();
        manager.resolve("routing", 5, "python", None).await.unwrap();
        assert!(manager.clear().await.unwrap() > 0);

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.hit_rate_percent, 0.0);
    }

    #[tokio::test]
    async fn test_hit_rate() {
        let (manager, _, _) = manager(false);

        manager.resolve("routing", 5, "python", None).await.unwrap();
        manager.resolve("routing", 5, "python", None).await.unwrap();
        manager.resolve("routing", 5, "python", None).await.unwrap();

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.hit_rate_percent, 66.67);
        assert_eq!(stats.fuzzy_threshold, 75.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_survive_capacity_eviction() {
        let config = CacheConfig {
            max_entries: 4,
            ..CacheConfig::default()
        };
        let store = Arc::new(MemoryStore::new(&config));
        let (manager, _) = manager_with(store.clone(), config, false);

        manager.resolve("routing", 5, "python", None).await.unwrap();
        manager.resolve("routing", 5, "python", None).await.unwrap();

        for query in ["alpha", "bravo", "charlie", "delta"] {
            tokio::time::advance(Duration::from_millis(10)).await;
            manager.resolve(query, 5, "python", None).await.unwrap();
        }

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.hits_exact, 1);
        assert_eq!(stats.misses, 5);
        assert_eq!(stats.api_requests_total, 5);
        assert_eq!(stats.entry_count, 4);
        assert!(!store.exists("routing|5|python").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_outlive_entry_ttl() {
        let config = CacheConfig {
            ttl_seconds: 60,
            ..CacheConfig::default()
        };
        let store = Arc::new(MemoryStore::new(&config));
        let (manager, _) = manager_with(store, config, false);

        manager.resolve("routing", 5, "python", None).await.unwrap();
        manager.resolve("routing", 5, "python", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.hits_exact, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.api_requests_total, 1);
    }
}
