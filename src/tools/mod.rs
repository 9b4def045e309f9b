//! Agent-facing tools.
//!
//! Every tool returns a [`ToolResult`]: either the text handed back to the
//! agent, or a structured [`ToolError`] the agent can reason about. Tools
//! are registered by name in a [`ToolRegistry`] and invoked with JSON
//! arguments.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod builtin;
mod service;

pub use builtin::{CacheStatsTool, ClearCacheTool, SearchDocsTool};
pub use service::DocSearchService;

use crate::error::{DocSearchError, Result};
use crate::search::FetchFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Structured failure returned to the agent instead of raising.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            query: None,
            suggestion: None,
            details: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<FetchFailure> for ToolError {
    fn from(failure: FetchFailure) -> Self {
        Self {
            error: failure.error,
            message: failure.message,
            query: Some(failure.query),
            suggestion: Some(failure.suggestion),
            details: Some(failure.details),
        }
    }
}

/// Outcome of a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(String),
    Error(ToolError),
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }

    /// Text handed to the agent: the result itself, or the error as JSON.
    pub fn into_text(self) -> String {
        match self {
            ToolResult::Success(text) => text,
            ToolResult::Error(error) => serde_json::to_string(&error).unwrap_or_else(|_| {
                format!(r#"{{"error":"{}","message":"{}"}}"#, error.error, error.message)
            }),
        }
    }
}

/// A capability the agent can call by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    async fn invoke(&self, args: Value) -> ToolResult;
}

/// Name, description, and schema of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tools available to the agent, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `search_docs`, `get_cache_stats`, and `clear_cache`.
    pub fn with_docsearch(service: Arc<DocSearchService>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchDocsTool::new(service.clone())));
        registry.register(Arc::new(CacheStatsTool::new(service.clone())));
        registry.register(Arc::new(ClearCacheTool::new(service)));
        registry
    }

    /// Add a tool, replacing any tool registered under the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| DocSearchError::UnknownTool(name.to_string()))?;
        Ok(tool.invoke(args).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_text_is_json() {
        let text = ToolResult::Error(
            ToolError::invalid_request("page_size must be between 1 and 20").with_details("got 50"),
        )
        .into_text();

        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["error"], "invalid_request");
        assert_eq!(json["details"], "got 50");
        assert!(json.get("query").is_none());
    }

    #[test]
    fn test_success_text_passes_through() {
        let result = ToolResult::Success("No results found.".to_string());
        assert!(!result.is_error());
        assert_eq!(result.into_text(), "No results found.");
    }

    #[test]
    fn test_from_fetch_failure_keeps_all_fields() {
        let failure = FetchFailure {
            error: "search_failed".to_string(),
            message: "failed".to_string(),
            query: "routing".to_string(),
            suggestion: "retry".to_string(),
            details: "timeout_error: timed out".to_string(),
        };
        let error = ToolError::from(failure);
        assert_eq!(error.query.as_deref(), Some("routing"));
        assert_eq!(error.suggestion.as_deref(), Some("retry"));
        assert_eq!(error.details.as_deref(), Some("timeout_error: timed out"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("link_check", Value::Null).await.unwrap_err();
        assert!(matches!(err, DocSearchError::UnknownTool(name) if name == "link_check"));
    }
}
