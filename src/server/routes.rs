// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    clear_cache_handler, health_handler, invoke_tool_handler, list_tools_handler,
    metrics_handler, search_handler, stats_handler,
};
use super::middleware::{body_limit_layer, request_id_layers};
use crate::config::AppConfig;
use crate::metrics::PrometheusMetrics;
use crate::tools::{DocSearchService, ToolRegistry};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub service: Arc<DocSearchService>,
    pub tools: ToolRegistry,
    pub exporter: Arc<PrometheusMetrics>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        service: Arc<DocSearchService>,
        exporter: Arc<PrometheusMetrics>,
    ) -> Self {
        Self {
            tools: ToolRegistry::with_docsearch(service.clone()),
            config,
            service,
            exporter,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let (set_request_id, propagate_request_id) = request_id_layers();

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/search", post(search_handler))
        .route("/v1/cache/stats", get(stats_handler))
        .route("/v1/cache", delete(clear_cache_handler))
        .route("/v1/tools", get(list_tools_handler))
        .route("/v1/tools/:name", post(invoke_tool_handler))
        .layer(body_limit_layer())
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state)
}
