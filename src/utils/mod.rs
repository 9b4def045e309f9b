//! Utility functions and helpers for docsearch-cache.
//!
//! This module provides cross-cutting concerns like structured logging,
//! secret sanitization, and bounded retry with backoff.
//!
//! # Submodules
//!
//! - `logging`: Tracing and logging initialization with secret filters.
//! - `retry`: Retry policies and a generic retry loop.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
