// Prometheus registry and collectors, owned per service instance
// Author: kelexine (https://github.com/kelexine)

use crate::error::{DocSearchError, Result};
use prometheus::{
    register_int_counter_vec_with_registry, register_int_gauge_with_registry, Encoder,
    IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Prometheus collectors for one deployment.
///
/// The registry lives inside this struct rather than in a global so that
/// independent services (and tests) never share counters.
pub struct PrometheusMetrics {
    registry: Registry,

    /// Cache lookups by outcome: exact, fuzzy, miss
    cache_lookups: IntCounterVec,

    /// Upstream search attempts by status: success, failure
    upstream_requests: IntCounterVec,

    /// Live cache entries at the last stats snapshot
    cache_entries: IntGauge,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cache_lookups = register_int_counter_vec_with_registry!(
            Opts::new("docsearch_cache_lookups_total", "Cache lookups by outcome"),
            &["outcome"],
            registry
        )
        .map_err(prometheus_error)?;

        let upstream_requests = register_int_counter_vec_with_registry!(
            Opts::new(
                "docsearch_upstream_requests_total",
                "Documentation search API attempts"
            ),
            &["status"],
            registry
        )
        .map_err(prometheus_error)?;

        let cache_entries = register_int_gauge_with_registry!(
            Opts::new("docsearch_cache_entries", "Live cache entries"),
            registry
        )
        .map_err(prometheus_error)?;

        Ok(Self {
            registry,
            cache_lookups,
            upstream_requests,
            cache_entries,
        })
    }

    pub fn record_lookup(&self, outcome: &str) {
        self.cache_lookups.with_label_values(&[outcome]).inc();
    }

    pub fn record_upstream(&self, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.upstream_requests.with_label_values(&[status]).inc();
    }

    pub fn set_cache_entries(&self, count: usize) {
        self.cache_entries.set(count as i64);
    }

    /// Gather all metrics and return them in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(prometheus_error)?;
        String::from_utf8(buffer).map_err(|e| DocSearchError::Internal(e.to_string()))
    }
}

fn prometheus_error(e: prometheus::Error) -> DocSearchError {
    DocSearchError::Internal(format!("metrics error: {}", e))
}
