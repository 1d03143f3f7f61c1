//! # Bounded Retry With Exponential Backoff
//!
//! A wrapped-call helper for operations whose failure is decided by the caller
//! (for example a chat API answering `200 OK` with `{"ok": false}`), which the
//! transport middleware in [`super::ky_http`] cannot see.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{error, info, warn};
use tokio::time::sleep;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every retry.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy from explicit values.
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_factor,
        }
    }

    /// Delay slept after the failed attempt number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(retry as i32);
        self.initial_delay.mul_f64(factor)
    }

    /// Total number of attempts the policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. The first `Ok` short-circuits;
/// after the last failed attempt the final error is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= max_attempts {
                    error!("{} failed after {} retries: {}", label, policy.max_retries, e);
                    return Err(e);
                }

                let delay = policy.delay_for(attempt - 1);
                warn!("{} failed (attempt {}/{}): {}", label, attempt, max_attempts, e);
                info!("Retrying in {:.1} seconds...", delay.as_secs_f64());
                sleep(delay).await;
            }
        }
    }
}
