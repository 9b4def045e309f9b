// Bounded-retry wrapper around the documentation search call
// Author: kelexine (https://github.com/kelexine)

use super::{format_results, SearchBackend, SearchRequest};
use crate::error::DocSearchError;
use crate::metrics::MetricsReporter;
use crate::utils::retry::{with_retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Structured error handed back to the agent when every attempt failed.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FetchFailure {
    pub error: String,
    pub message: String,
    pub query: String,
    pub suggestion: String,
    pub details: String,
}

impl FetchFailure {
    fn exhausted(query: &str, attempts: u32, last_error: &DocSearchError) -> Self {
        Self {
            error: "search_failed".to_string(),
            message: format!(
                "Documentation search failed after {} attempt(s)",
                attempts
            ),
            query: query.to_string(),
            suggestion: "Retry shortly, or answer from existing knowledge and tell the user \
                         the documentation could not be reached."
                .to_string(),
            details: format!("{}: {}", last_error.kind(), last_error),
        }
    }
}

/// Calls the search backend with a fixed delay between attempts and never
/// propagates a failure: exhaustion becomes a [`FetchFailure`] value.
pub struct RetryableFetcher {
    backend: Arc<dyn SearchBackend>,
    metrics: MetricsReporter,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    link_base_url: String,
}

impl RetryableFetcher {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        metrics: MetricsReporter,
        policy: RetryPolicy,
        attempt_timeout: Duration,
        link_base_url: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            metrics,
            policy,
            attempt_timeout,
            link_base_url: link_base_url.into(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Search and format the results.
    ///
    /// Each attempt is bounded by the per-attempt timeout and counted in
    /// `api_requests_total`. Dropping the returned future abandons any
    /// remaining attempts.
    pub async fn fetch(
        &self,
        query: &str,
        page_size: u32,
        language: &str,
        version: Option<&str>,
    ) -> Result<String, FetchFailure> {
        let request = SearchRequest::new(query, page_size, language, version);
        let request = &request;

        let outcome = with_retry("Documentation search", &self.policy, |attempt| async move {
            let result =
                match tokio::time::timeout(self.attempt_timeout, self.backend.search(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(DocSearchError::Timeout(self.attempt_timeout.as_secs())),
                };

            self.metrics.record_upstream_attempt(result.is_ok()).await;
            if result.is_ok() {
                debug!("Search attempt {} succeeded", attempt);
            }
            result
        })
        .await;

        match outcome {
            Ok(hits) => Ok(format_results(&hits, &self.link_base_url)),
            Err(e) => {
                warn!(
                    "Search for {:?} exhausted {} attempts, returning structured error",
                    query, self.policy.max_attempts
                );
                Err(FetchFailure::exhausted(query, self.policy.max_attempts, &e))
            }
        }
    }
}
