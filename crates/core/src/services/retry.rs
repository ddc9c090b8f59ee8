//! Retry wrapper for labeling oracles.
//!
//! Transient failures are retried with exponential backoff. Rate-limit
//! failures use their own (larger) backoff schedule and honour a
//! server-provided `retry_after`. Authentication failures are returned
//! immediately.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::organize::CancellationToken;
use crate::services::oracle::{LabelingOracle, OracleError, OracleErrorKind, OracleRequest};

/// Largest exponent used when doubling the backoff.
const MAX_DOUBLINGS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub retries: u32,
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
    pub rate_limit_backoff_factor: Duration,
    pub rate_limit_max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff_factor: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            rate_limit_backoff_factor: Duration::from_secs(10),
            rate_limit_max_backoff: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts.
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            backoff_factor: Duration::ZERO,
            max_backoff: Duration::ZERO,
            rate_limit_backoff_factor: Duration::ZERO,
            rate_limit_max_backoff: Duration::ZERO,
        }
    }

    /// Wait before the next attempt, `attempt` being the number of failures so far (1-based).
    pub fn delay_for(&self, error: &OracleError, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(MAX_DOUBLINGS);
        if error.is_rate_limited() {
            if let Some(wait) = error.retry_after {
                return wait;
            }
            self.rate_limit_backoff_factor
                .saturating_mul(1 << doublings)
                .min(self.rate_limit_max_backoff)
        } else {
            self.backoff_factor.saturating_mul(1 << doublings).min(self.max_backoff)
        }
    }
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Wraps another oracle with the retry policy.
pub struct RetryingOracle<O> {
    inner: O,
    policy: RetryPolicy,
    cancel: CancellationToken,
    sleep: Sleeper,
}

impl<O: LabelingOracle> RetryingOracle<O> {
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        Self { inner, policy, cancel: CancellationToken::new(), sleep: Box::new(thread::sleep) }
    }

    /// Abort between attempts once `cancel` is set.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the function used to wait between attempts.
    pub fn with_sleeper<S>(mut self, sleep: S) -> Self
    where
        S: Fn(Duration) + Send + Sync + 'static,
    {
        self.sleep = Box::new(sleep);
        self
    }
}

impl<O: LabelingOracle> LabelingOracle for RetryingOracle<O> {
    fn request(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let mut attempt = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(OracleError::unknown("cancelled"));
            }

            debug!("Oracle request attempt {} for {}", attempt + 1, request.file_name);
            let err = match self.inner.request(request) {
                Ok(answer) => return Ok(answer),
                Err(err) => err,
            };

            attempt += 1;
            if err.kind == OracleErrorKind::Auth || attempt > self.policy.retries {
                return Err(err);
            }

            let delay = self.policy.delay_for(&err, attempt);
            warn!(
                "Oracle request failed (attempt {attempt}/{}): {err} - retrying in {:.2}s",
                self.policy.retries,
                delay.as_secs_f64()
            );
            (self.sleep)(delay);
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl<O> fmt::Debug for RetryingOracle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingOracle").field("policy", &self.policy).finish_non_exhaustive()
    }
}
