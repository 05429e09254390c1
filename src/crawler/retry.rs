//! Bounded retry with a fixed delay
//!
//! Wraps a whole crawl cycle. Transient failures (network blips, a flaky
//! empty page, an I/O hiccup) are retried after a fixed pause; anything that
//! cannot succeed on a second try is returned immediately.

use crate::config::RetryConfig;
use crate::Result;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently to retry a failing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.delay_ms))
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// The error of the final attempt is returned to the caller.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.attempts => {
                    tracing::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.attempts,
                        e,
                        self.delay
                    );
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        tracing::error!("Giving up after {} attempts: {}", attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
