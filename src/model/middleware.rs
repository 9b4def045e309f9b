// Bounded-retry middleware around a single model invocation
// Author: kelexine (https://github.com/kelexine)

use super::FinishReason;
use crate::config::ModelRetryConfig;
use crate::utils::retry::RetryPolicy;
use backoff::backoff::Backoff;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Raised when every attempt returned a retryable (malformed-output)
/// finish reason without the call itself ever failing on the last attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Model returned malformed output (finish reason {finish_reason}) after {attempts} attempts")]
pub struct MalformedResponseError {
    pub finish_reason: String,
    pub attempts: u32,
}

/// Terminal failure of a retried model call.
///
/// `Handler` carries the handler's last error exactly as it was returned,
/// so outer layers can match on the provider's own error type.
#[derive(Debug)]
pub enum ModelCallError<E> {
    Handler(E),
    Malformed(MalformedResponseError),
}

impl<E> ModelCallError<E> {
    pub fn is_malformed(&self) -> bool {
        matches!(self, ModelCallError::Malformed(_))
    }

    /// The handler's original error, if that is what ended the call.
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            ModelCallError::Handler(e) => Some(e),
            ModelCallError::Malformed(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ModelCallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelCallError::Handler(e) => e.fmt(f),
            ModelCallError::Malformed(e) => e.fmt(f),
        }
    }
}

impl<E> std::error::Error for ModelCallError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelCallError::Handler(e) => Some(e),
            ModelCallError::Malformed(e) => Some(e),
        }
    }
}

/// Retries a model call on errors and on malformed-output finish reasons,
/// sleeping `initial_delay * backoff_factor^n` before retry `n`.
#[derive(Debug, Clone)]
pub struct ModelCallRetryMiddleware {
    policy: RetryPolicy,
    /// Upper-cased finish reasons that trigger a retry
    retryable_finish_reasons: HashSet<String>,
}

impl ModelCallRetryMiddleware {
    /// `max_retries` counts retries after the first call.
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            policy: RetryPolicy::exponential(
                max_retries + 1,
                initial_delay,
                backoff_factor,
                Duration::from_secs(3600),
            ),
            retryable_finish_reasons: HashSet::from(["MALFORMED_FUNCTION_CALL".to_string()]),
        }
    }

    pub fn from_config(config: &ModelRetryConfig) -> Self {
        Self {
            policy: RetryPolicy::from_model_config(config),
            retryable_finish_reasons: HashSet::new(),
        }
        .with_retryable_finish_reasons(config.retryable_finish_reasons.iter().cloned())
    }

    /// Replace the set of finish reasons treated as malformed output.
    pub fn with_retryable_finish_reasons<I, S>(mut self, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_finish_reasons = reasons
            .into_iter()
            .map(|r| r.into().to_uppercase())
            .collect();
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.policy.max_attempts.saturating_sub(1)
    }

    pub fn is_retryable(&self, finish_reason: Option<&str>) -> bool {
        finish_reason
            .map(|reason| self.retryable_finish_reasons.contains(&reason.to_uppercase()))
            .unwrap_or(false)
    }

    /// Invoke `handler` with up to `max_retries` retries.
    ///
    /// - A response with a non-retryable finish reason is returned as-is.
    /// - A retryable finish reason or a handler error is retried while
    ///   attempts remain.
    /// - Once attempts run out, the last outcome decides the error: the
    ///   handler's original error, or [`MalformedResponseError`].
    pub async fn call<Req, Resp, E, F, Fut>(
        &self,
        request: Req,
        mut handler: F,
    ) -> Result<Resp, ModelCallError<E>>
    where
        Req: Clone,
        Resp: FinishReason,
        E: fmt::Display,
        F: FnMut(Req) -> Fut,
        Fut: Future<Output = Result<Resp, E>>,
    {
        let max_retries = self.max_retries();
        let mut backoff = self.policy.backoff();
        let mut attempt: u32 = 0;

        loop {
            match handler(request.clone()).await {
                Ok(response) => {
                    if !self.is_retryable(response.finish_reason()) {
                        if attempt > 0 {
                            debug!("Model call succeeded after {} retries", attempt);
                        }
                        return Ok(response);
                    }

                    let reason = response.finish_reason().unwrap_or_default().to_string();
                    if attempt >= max_retries {
                        warn!(
                            "Model returned {} on final attempt {}, giving up",
                            reason,
                            attempt + 1
                        );
                        return Err(ModelCallError::Malformed(MalformedResponseError {
                            finish_reason: reason,
                            attempts: attempt + 1,
                        }));
                    }
                    warn!(
                        "Model returned retryable finish reason {} (attempt {}/{})",
                        reason,
                        attempt + 1,
                        max_retries + 1
                    );
                }
                Err(e) => {
                    if attempt >= max_retries {
                        warn!(
                            "Model call failed on final attempt {}, re-raising: {}",
                            attempt + 1,
                            e
                        );
                        return Err(ModelCallError::Handler(e));
                    }
                    warn!(
                        "Model call failed (attempt {}/{}): {}",
                        attempt + 1,
                        max_retries + 1,
                        e
                    );
                }
            }

            let delay = backoff.next_backoff().unwrap_or(self.policy.max_delay);
            debug!("Retrying model call in {}ms", delay.as_millis());
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
