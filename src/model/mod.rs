//! Language-model invocation seam used by the agent.
//!
//! The model provider itself is external; this module defines the request
//! and response shapes the agent exchanges with it, the [`ChatModel`] trait
//! providers implement, and the resilience layers wrapped around every call:
//!
//! - `middleware`: bounded retry with exponential backoff that tells broken
//!   calls apart from malformed output.
//! - `fallback`: ordered model substitution once a model's retries run out.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod fallback;
mod middleware;

pub use fallback::ModelFallback;
pub use middleware::{MalformedResponseError, ModelCallError, ModelCallRetryMiddleware};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A conversation turn sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// `system`, `user`, `assistant`, or `tool`.
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Model invocation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Provider metadata attached to a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Why generation stopped (e.g. `STOP`, `MAX_TOKENS`, `MALFORMED_FUNCTION_CALL`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Model output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
}

impl ModelResponse {
    pub fn new(content: impl Into<String>, finish_reason: Option<&str>) -> Self {
        Self {
            content: content.into(),
            response_metadata: ResponseMetadata {
                finish_reason: finish_reason.map(str::to_string),
            },
        }
    }
}

/// Access to a response's finish-reason metadata.
pub trait FinishReason {
    fn finish_reason(&self) -> Option<&str>;
}

impl FinishReason for ModelResponse {
    fn finish_reason(&self) -> Option<&str> {
        self.response_metadata.finish_reason.as_deref()
    }
}

/// Failures raised by a model provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model provider error: {0}")]
    Provider(String),

    #[error("Model rate limited: {0}")]
    RateLimited(String),

    #[error("Model call timed out")]
    Timeout,

    #[error("Invalid model request: {0}")]
    InvalidRequest(String),
}

/// A language model the agent can call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, used in logs.
    fn name(&self) -> &str;

    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}
