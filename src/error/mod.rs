// Error types for docsearch-cache
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocSearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search API error: {0}")]
    SearchApi(String),

    #[error("Search API request timed out after {0}s")]
    Timeout(u64),

    #[error("Cache store error: {0}")]
    CacheStore(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocSearchError {
    /// Short machine-readable kind, shared by HTTP bodies and tool errors.
    pub fn kind(&self) -> &'static str {
        match self {
            DocSearchError::Config(_) | DocSearchError::ConfigParsing(_) => "configuration_error",
            DocSearchError::SearchApi(_) | DocSearchError::Http(_) => "search_api_error",
            DocSearchError::Timeout(_) => "timeout_error",
            DocSearchError::CacheStore(_) => "cache_store_error",
            DocSearchError::InvalidRequest(_) | DocSearchError::Json(_) => "invalid_request_error",
            DocSearchError::UnknownTool(_) => "not_found_error",
            DocSearchError::Io(_) | DocSearchError::Internal(_) => "api_error",
        }
    }
}

// Convert DocSearchError to HTTP responses for Axum
impl IntoResponse for DocSearchError {
    fn into_response(self) -> Response {
        let status = match self {
            DocSearchError::InvalidRequest(_) | DocSearchError::Json(_) => StatusCode::BAD_REQUEST,
            DocSearchError::UnknownTool(_) => StatusCode::NOT_FOUND,
            DocSearchError::SearchApi(_) | DocSearchError::Http(_) => StatusCode::BAD_GATEWAY,
            DocSearchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DocSearchError::CacheStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DocSearchError>;
