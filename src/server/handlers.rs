// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::cache::CacheStats;
use crate::error::Result;
use crate::tools::{ToolDescriptor, ToolError, ToolResult};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // The search path fails open, so a broken store only degrades
    let cache_check = match state.service.get_cache_stats().await {
        Ok(stats) => HealthCheck {
            status: "ok".to_string(),
            message: format!(
                "{} entries, {:.1}% hit rate",
                stats.entry_count, stats.hit_rate_percent
            ),
        },
        Err(e) => {
            overall_status = HealthStatus::Degraded;
            HealthCheck {
                status: "warning".to_string(),
                message: format!("Cache store unavailable: {}", e),
            }
        }
    };
    checks.insert("cache_store".to_string(), cache_check);

    let search_check = if state.config.search.api_url.is_empty() {
        overall_status = HealthStatus::Unhealthy;
        HealthCheck {
            status: "error".to_string(),
            message: "Search endpoint not configured".to_string(),
        }
    } else {
        HealthCheck {
            status: "ok".to_string(),
            message: format!("Search endpoint: {}", state.config.search.api_url),
        }
    };
    checks.insert("search_endpoint".to_string(), search_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Prometheus text exposition
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response> {
    if let Ok(stats) = state.service.get_cache_stats().await {
        state.exporter.set_cache_entries(stats.entry_count);
    }
    let body = state.exporter.gather()?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default, alias = "pageSize")]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub content: String,
}

/// Handler for /v1/search
///
/// Structured tool errors are returned as JSON with 400 for invalid
/// arguments and 502 when the search service could not be reached.
pub async fn search_handler(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Response {
    debug!("Search request: {:?}", body.query);

    let result = state
        .service
        .search_docs(
            &body.query,
            body.page_size,
            body.version.as_deref(),
            body.language.as_deref(),
        )
        .await;

    match result {
        ToolResult::Success(content) => Json(SearchResponse { content }).into_response(),
        ToolResult::Error(error) => tool_error_response(error),
    }
}

fn tool_error_response(error: ToolError) -> Response {
    let status = if error.error == "invalid_request" {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(error)).into_response()
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStats>> {
    Ok(Json(state.service.get_cache_stats().await?))
}

pub async fn clear_cache_handler(State(state): State<AppState>) -> Result<StatusCode> {
    state.service.clear_cache().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tools_handler(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.tools.descriptors())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolInvocationResponse {
    pub tool: String,
    pub is_error: bool,
    pub content: String,
}

/// Handler for /v1/tools/:name
///
/// Tool failures are part of a successful invocation: the agent reads
/// `is_error` and the structured error text.
pub async fn invoke_tool_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<ToolInvocationResponse>> {
    let result = state.tools.invoke(&name, args).await?;

    Ok(Json(ToolInvocationResponse {
        tool: name,
        is_error: result.is_error(),
        content: result.into_text(),
    }))
}
