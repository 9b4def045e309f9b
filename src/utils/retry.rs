// Bounded retry with deterministic backoff
// Author: kelexine (https://github.com/kelexine)

use crate::config::{ModelRetryConfig, RetryConfig};
use backoff::{backoff::Backoff, ExponentialBackoff};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// `1.0` gives a constant delay.
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Constant delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            backoff_factor: 1.0,
            max_delay: delay,
        }
    }

    /// Delay of `initial_delay * backoff_factor^n` before retry `n`, capped.
    pub fn exponential(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_factor: f64,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_factor,
            max_delay,
        }
    }

    /// Search fetch policy: `max_retries` counts total attempts.
    pub fn from_fetch_config(config: &RetryConfig) -> Self {
        Self::fixed(
            config.max_retries.max(1),
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Model call policy: `max_retries` counts retries after the first call.
    pub fn from_model_config(config: &ModelRetryConfig) -> Self {
        Self::exponential(
            config.max_retries + 1,
            Duration::from_millis(config.initial_delay_ms),
            config.backoff_factor,
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Zero-jitter exponential backoff that never gives up on its own;
    /// the attempt count is enforced by the caller.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: self.backoff_factor,
            max_interval: self.max_delay.max(self.initial_delay),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Execute `operation` until it succeeds or `policy.max_attempts` is reached.
///
/// The closure receives the 1-based attempt number. Every failure is logged;
/// the last error is returned unchanged.
pub async fn with_retry<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt >= policy.max_attempts {
                    warn!(
                        "{} failed on attempt {}/{}, giving up: {}",
                        operation_name, attempt, policy.max_attempts, e
                    );
                    return Err(e);
                }

                let delay = backoff.next_backoff().unwrap_or(policy.max_delay);
                warn!(
                    "{} failed on attempt {}/{}, retrying after {}ms: {}",
                    operation_name,
                    attempt,
                    policy.max_attempts,
                    delay.as_millis(),
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
