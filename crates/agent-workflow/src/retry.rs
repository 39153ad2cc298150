//! Retry logic with exponential backoff and per-attempt timeout

use agent_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// How often and how patiently an agent call is attempted
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single delay
    pub max_backoff: Duration,

    pub backoff_multiplier: f64,

    /// Limit for one attempt; `None` waits indefinitely
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            attempt_timeout: Some(Duration::from_secs(180)),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no timeout
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            attempt_timeout: None,
        }
    }

    /// Short delays, for tests and local models
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            attempt_timeout: Some(Duration::from_secs(5)),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_attempt_timeout(mut self, limit: Option<Duration>) -> Self {
        self.attempt_timeout = limit;
        self
    }

    /// Delay before retry number `attempt` (1-based)
    fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(backoff_ms as u64).min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Attempt {}/{} for {}", attempt, attempts, operation_name);

            let outcome = match self.attempt_timeout {
                Some(limit) => timeout(limit, operation())
                    .await
                    .unwrap_or_else(|_| {
                        Err(Error::Timeout {
                            agent: operation_name.to_string(),
                            seconds: limit.as_secs(),
                        })
                    }),
                None => operation().await,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded after {} retries", operation_name, attempt - 1);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                debug!("{} failed with non-retryable error", operation_name);
                return Err(err);
            }

            if attempt >= attempts {
                warn!("{} failed after {} attempts: {}", operation_name, attempts, err);
                return Err(err);
            }

            let backoff = self.backoff_duration(attempt);
            warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                operation_name, attempt, attempts, err, backoff
            );
            sleep(backoff).await;
        }
    }
}
