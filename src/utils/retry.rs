//! Retry policy for upstream requests
//!
//! The listings API bans clients that hammer it, so retries are bounded and
//! use a fixed pause rather than exponential growth. A [`RetryPolicy`] is a
//! plain value passed to the operation that needs it.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Pause before every attempt after the first
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::rate_limit(Duration::from_secs(10))
    }
}

impl RetryPolicy {
    /// Create a policy with explicit attempts and pause
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// One retry after a rate-limit response
    pub fn rate_limit(backoff: Duration) -> Self {
        Self::new(2, backoff)
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before the given zero-based attempt
    fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.backoff
        }
    }
}

/// Execute an operation, retrying only errors accepted by `should_retry`
///
/// Returns the first success, the first non-retryable error, or the last
/// error once the policy's attempts are used up.
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        let delay = policy.delay_for(attempt);
        if !delay.is_zero() {
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                attempt += 1;
                if !should_retry(&e) {
                    return Err(e);
                }
                if attempt >= policy.max_attempts {
                    warn!(
                        attempts = attempt,
                        error = %e,
                        "Retry attempts exhausted"
                    );
                    return Err(e);
                }
                warn!(
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Operation failed, will retry"
                );
            }
        }
    }
}
