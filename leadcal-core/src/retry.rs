//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        RetryPolicy { max_retries, delay }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Run `op` until it succeeds or the attempts are used up, sleeping
    /// `delay` between attempts. The error of the last attempt is returned.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            debug!(attempt, total = self.attempts(), "attempting");

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt <= self.max_retries => {
                    warn!(attempt, error = %e, "attempt failed, retrying in {:?}", self.delay);
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
