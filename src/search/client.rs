// HTTP client for the external documentation search service
// Author: kelexine (https://github.com/kelexine)

use super::{SearchBackend, SearchHit, SearchRequest};
use crate::config::SearchConfig;
use crate::error::{DocSearchError, Result};
use crate::utils::logging::sanitize;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Client for the documentation search API.
///
/// Performs a single request per call; retries and caching live in
/// [`super::RetryableFetcher`] and [`crate::cache::CacheManager`].
pub struct SearchClient {
    http_client: Client,
    config: SearchConfig,
    sanitize_secrets: bool,
}

impl SearchClient {
    /// Create a new search client.
    ///
    /// Fails with a configuration error when the endpoint or API key is
    /// missing; those are never retried.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(DocSearchError::Config(
                "search.api_url (DOCS_SEARCH_API_URL) is not set".to_string(),
            ));
        }
        if config.api_key.trim().is_empty() {
            return Err(DocSearchError::Config(
                "search.api_key (DOCS_SEARCH_API_KEY) is not set".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .use_rustls_tls()
            .build()
            .map_err(|e| DocSearchError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created search HTTP client for {}", config.api_url);

        Ok(Self {
            http_client,
            config: config.clone(),
            sanitize_secrets: true,
        })
    }

    /// Whether upstream error bodies are scrubbed of credentials before
    /// they are logged or returned.
    pub fn with_secret_sanitizing(mut self, enabled: bool) -> Self {
        self.sanitize_secrets = enabled;
        self
    }

    /// Get the search endpoint URL
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Extract error message from API response JSON
    fn extract_error_message(response_text: &str) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
            message: Option<String>,
        }

        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum ErrorDetail {
            Text(String),
            Object { message: Option<String> },
        }

        let parsed = serde_json::from_str::<ErrorResponse>(response_text).ok()?;
        match parsed.error {
            Some(ErrorDetail::Text(text)) => Some(text),
            Some(ErrorDetail::Object { message }) => message.or(parsed.message),
            None => parsed.message,
        }
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        debug!(
            "Searching docs: query={:?}, page_size={}",
            request.query, request.page_size
        );

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocSearchError::Timeout(self.config.timeout_seconds)
                } else {
                    DocSearchError::SearchApi(format!("HTTP error: {}", e))
                }
            })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| DocSearchError::SearchApi(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = Self::extract_error_message(&response_text)
                .unwrap_or_else(|| response_text.clone());
            let message = if self.sanitize_secrets {
                sanitize(&message, &self.config.api_key)
            } else {
                message
            };
            error!("Search API error: HTTP {} - {}", status, message);
            return Err(DocSearchError::SearchApi(format!("HTTP {}: {}", status, message)));
        }

        let hits: Vec<SearchHit> = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse search response: {}", e);
            DocSearchError::SearchApi(format!("Response parsing error: {}", e))
        })?;

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }
}
