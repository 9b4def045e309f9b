// search_docs, get_cache_stats, and clear_cache tools
// Author: kelexine (https://github.com/kelexine)

use super::{DocSearchService, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct SearchDocsArgs {
    query: String,
    #[serde(default, alias = "pageSize")]
    page_size: Option<u32>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

pub struct SearchDocsTool {
    service: Arc<DocSearchService>,
}

impl SearchDocsTool {
    pub fn new(service: Arc<DocSearchService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for SearchDocsTool {
    fn name(&self) -> &str {
        "search_docs"
    }

    fn description(&self) -> &str {
        "Search the product documentation. Returns matching pages as Title / Link / Content blocks."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural-language search query"
                },
                "page_size": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": self.service.max_page_size(),
                    "description": "Number of results to return"
                },
                "version": {
                    "type": "string",
                    "description": "Documentation version to search"
                },
                "language": {
                    "type": "string",
                    "description": "Programming language of the examples"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: Value) -> ToolResult {
        let args: SearchDocsArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => {
                return ToolResult::Error(
                    ToolError::invalid_request("Invalid search_docs arguments")
                        .with_details(e.to_string()),
                )
            }
        };

        self.service
            .search_docs(
                &args.query,
                args.page_size,
                args.version.as_deref(),
                args.language.as_deref(),
            )
            .await
    }
}

pub struct CacheStatsTool {
    service: Arc<DocSearchService>,
}

impl CacheStatsTool {
    pub fn new(service: Arc<DocSearchService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for CacheStatsTool {
    fn name(&self) -> &str {
        "get_cache_stats"
    }

    fn description(&self) -> &str {
        "Report search cache size, hit counts, and hit rate."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, _args: Value) -> ToolResult {
        let stats = match self.service.get_cache_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Failed to read cache stats: {}", e);
                return ToolResult::Error(
                    ToolError::new("cache_unavailable", "Cache statistics are unavailable")
                        .with_details(e.to_string()),
                );
            }
        };

        match serde_json::to_string_pretty(&stats) {
            Ok(text) => ToolResult::Success(text),
            Err(e) => ToolResult::Error(
                ToolError::new("internal_error", "Failed to encode cache statistics")
                    .with_details(e.to_string()),
            ),
        }
    }
}

pub struct ClearCacheTool {
    service: Arc<DocSearchService>,
}

impl ClearCacheTool {
    pub fn new(service: Arc<DocSearchService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for ClearCacheTool {
    fn name(&self) -> &str {
        "clear_cache"
    }

    fn description(&self) -> &str {
        "Remove every cached search result and reset cache statistics."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, _args: Value) -> ToolResult {
        match self.service.clear_cache().await {
            Ok(()) => ToolResult::Success("Cache cleared.".to_string()),
            Err(e) => ToolResult::Error(
                ToolError::new("cache_unavailable", "Failed to clear the cache")
                    .with_details(e.to_string()),
            ),
        }
    }
}
