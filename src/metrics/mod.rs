// Metrics module: store-persisted cache counters plus Prometheus exposition
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::PrometheusMetrics;

use crate::cache::CacheStore;
use std::sync::Arc;
use tracing::debug;

/// Prefix for counter keys, chosen so counters never match a cache-key scan.
pub const COUNTER_PREFIX: &str = "stats:";

/// Aggregate counters persisted next to cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    HitsExact,
    HitsFuzzy,
    Misses,
    ApiRequestsTotal,
}

impl Counter {
    pub fn name(&self) -> &'static str {
        match self {
            Counter::HitsExact => "hits_exact",
            Counter::HitsFuzzy => "hits_fuzzy",
            Counter::Misses => "misses",
            Counter::ApiRequestsTotal => "api_requests_total",
        }
    }

    pub fn key(&self) -> String {
        format!("{}{}", COUNTER_PREFIX, self.name())
    }

    /// Outcome label for cache lookup counters
    fn lookup_outcome(&self) -> Option<&'static str> {
        match self {
            Counter::HitsExact => Some("exact"),
            Counter::HitsFuzzy => Some("fuzzy"),
            Counter::Misses => Some("miss"),
            Counter::ApiRequestsTotal => None,
        }
    }
}

/// Current values of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub hits_exact: u64,
    pub hits_fuzzy: u64,
    pub misses: u64,
    pub api_requests_total: u64,
}

/// Records cache and upstream counters.
///
/// Counter writes never fail the caller: a broken store only costs accuracy.
#[derive(Clone)]
pub struct MetricsReporter {
    store: Arc<dyn CacheStore>,
    exporter: Option<Arc<PrometheusMetrics>>,
}

impl MetricsReporter {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            exporter: None,
        }
    }

    /// Mirror lookups and upstream attempts into a Prometheus registry.
    pub fn with_exporter(mut self, exporter: Arc<PrometheusMetrics>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn exporter(&self) -> Option<&Arc<PrometheusMetrics>> {
        self.exporter.as_ref()
    }

    pub async fn incr(&self, counter: Counter) {
        if let Err(e) = self.store.incr(&counter.key(), 1).await {
            debug!("Failed to increment {}: {}", counter.name(), e);
        }

        if let (Some(exporter), Some(outcome)) = (&self.exporter, counter.lookup_outcome()) {
            exporter.record_lookup(outcome);
        }
    }

    /// Count one upstream attempt and its result.
    pub async fn record_upstream_attempt(&self, success: bool) {
        self.incr(Counter::ApiRequestsTotal).await;
        if let Some(exporter) = &self.exporter {
            exporter.record_upstream(success);
        }
    }

    /// Read a counter; absent, stale, or unreadable counters read as 0.
    pub async fn get(&self, counter: Counter) -> u64 {
        match self.store.get(&counter.key()).await {
            Ok(Some(value)) => value.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                debug!("Failed to read {}: {}", counter.name(), e);
                0
            }
        }
    }

    pub async fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            hits_exact: self.get(Counter::HitsExact).await,
            hits_fuzzy: self.get(Counter::HitsFuzzy).await,
            misses: self.get(Counter::Misses).await,
            api_requests_total: self.get(Counter::ApiRequestsTotal).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use std::time::Duration;

    fn reporter() -> MetricsReporter {
        MetricsReporter::new(Arc::new(MemoryStore::with_limits(Duration::from_secs(60), 0)))
    }

    #[tokio::test]
    async fn test_counters_start_at_zero() {
        assert_eq!(reporter().snapshot().await, CounterSnapshot::default());
    }

    #[tokio::test]
    async fn test_incr_and_snapshot() {
        let reporter = reporter();
        reporter.incr(Counter::HitsExact).await;
        reporter.incr(Counter::HitsExact).await;
        reporter.incr(Counter::Misses).await;
        reporter.record_upstream_attempt(false).await;

        let snapshot = reporter.snapshot().await;
        assert_eq!(snapshot.hits_exact, 2);
        assert_eq!(snapshot.hits_fuzzy, 0);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.api_requests_total, 1);
    }

    #[tokio::test]
    async fn test_exporter_mirrors_lookups() {
        let exporter = Arc::new(PrometheusMetrics::new().unwrap());
        let reporter = reporter().with_exporter(exporter.clone());
        reporter.incr(Counter::HitsFuzzy).await;
        reporter.record_upstream_attempt(true).await;

        let text = exporter.gather().unwrap();
        assert!(text.contains("outcome=\"fuzzy\"} 1"));
        assert!(text.contains("status=\"success\"} 1"));
    }

    #[test]
    fn test_counter_keys_are_not_cache_keys() {
        for counter in [
            Counter::HitsExact,
            Counter::HitsFuzzy,
            Counter::Misses,
            Counter::ApiRequestsTotal,
        ] {
            assert!(crate::cache::CacheKey::parse(&counter.key()).is_none());
        }
    }
}
