//! Axum-based HTTP surface for docsearch-cache.
//!
//! Exposes the agent tools over HTTP alongside health and Prometheus
//! endpoints.
//!
//! # Components
//!
//! - `handlers`: search, cache statistics and clearing, tool listing and invocation.
//! - `middleware`: request ID tracking and body size limits.
//! - `routes`: the router and its shared [`AppState`].
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::{HealthResponse, SearchBody, SearchResponse, ToolInvocationResponse};
pub use routes::{create_router, AppState};
