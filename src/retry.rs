//! Startup retry with exponential backoff.
//!
//! Only process startup (connecting to the database) retries. Background
//! sync writes never retry in place: the next reconciliation tick is their
//! retry mechanism.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff policy for a retried operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one (values below 1 act as 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Preset: database connect at startup (5 attempts)
    /// Delays: 500ms, 1s, 2s, 4s = 7.5s total wait time
    pub fn database_connect() -> Self {
        Self::new(5, Duration::from_millis(500)).with_max_delay(Duration::from_secs(8))
    }

    /// Delay to wait after the `failures`-th failed attempt (1-indexed)
    fn delay_after(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::database_connect()
    }
}

/// Run `operation` until it succeeds or the policy's attempts run out.
///
/// Returns the last error when every attempt failed.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut failures = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if failures > 0 {
                    debug!("{}: succeeded after {} failed attempt(s)", operation_name, failures);
                }
                return Ok(value);
            }
            Err(e) => {
                failures += 1;
                if failures >= max_attempts {
                    warn!(
                        "{}: all {} attempts failed. Last error: {}",
                        operation_name, max_attempts, e
                    );
                    return Err(e);
                }

                let delay = policy.delay_after(failures);
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {:?}",
                    operation_name, failures, max_attempts, e, delay
                );
                sleep(delay).await;
            }
        }
    }
}
