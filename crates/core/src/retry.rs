//! Bounded exponential-backoff retry for collaborator calls.
//!
//! Every store and event-source call the engine makes goes through a
//! [`RetryPolicy`]. Transient errors (see [`Error::is_transient`]) are retried
//! until the attempt budget runs out, at which point the call fails with
//! [`Error::RetriesExhausted`]. Other errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use log::{error, info, warn};

use crate::errors::{Error, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Builds the delay schedule for one retried call.
    ///
    /// Delays are deterministic (no jitter) and the schedule never expires on
    /// its own; the attempt budget is the only stop condition.
    pub fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff::default();
        backoff.initial_interval = self.base_delay;
        backoff.current_interval = self.base_delay;
        backoff.randomization_factor = 0.0;
        backoff.multiplier = self.multiplier;
        backoff.max_interval = self.max_delay;
        backoff.max_elapsed_time = None;
        backoff.reset();
        backoff
    }

    /// Starts tracking the attempts of one retried operation.
    pub fn budget(&self) -> RetryBudget<'_> {
        RetryBudget {
            policy: self,
            backoff: self.backoff(),
            failures: 0,
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut budget = self.budget();
        loop {
            match op().await {
                Ok(value) => {
                    budget.succeeded(operation);
                    return Ok(value);
                }
                Err(err) => budget.retry_after(operation, err).await?,
            }
        }
    }
}

/// Attempt accounting for one operation whose attempts are driven by the
/// caller, such as a stream that is resumed after a mid-stream failure.
pub struct RetryBudget<'a> {
    policy: &'a RetryPolicy,
    backoff: ExponentialBackoff,
    failures: u32,
}

impl RetryBudget<'_> {
    /// Failed attempts recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn succeeded(&self, operation: &str) {
        if self.failures > 0 {
            info!("{} succeeded on attempt {}", operation, self.failures + 1);
        }
    }

    /// Records a failed attempt.
    ///
    /// Returns `Ok` once the backoff delay has elapsed and another attempt is
    /// allowed. Permanent errors come back unchanged; a transient error that
    /// spends the last attempt becomes [`Error::RetriesExhausted`].
    pub async fn retry_after(&mut self, operation: &str, err: Error) -> Result<()> {
        if !err.is_transient() {
            return Err(err);
        }
        self.failures += 1;
        let max_attempts = self.policy.max_attempts.max(1);
        if self.failures >= max_attempts {
            error!(
                "{} failed after {} attempts: {}",
                operation, self.failures, err
            );
            return Err(Error::RetriesExhausted {
                operation: operation.to_string(),
                attempts: self.failures,
                last_error: err.to_string(),
            });
        }
        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.policy.max_delay);
        warn!(
            "{} failed (attempt {}/{}): {}; retrying in {:?}",
            operation, self.failures, max_attempts, err, delay
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }
}
