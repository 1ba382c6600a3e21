//! Exponential backoff for quota refusals.
//!
//! Only rate-limited failures are retried. Anything else goes straight back to
//! the caller, on the first attempt, without sleeping.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::warn;

use crate::error::UplinkError;

/// Errors that know whether the upstream refused them for quota reasons.
pub trait Retryable {
    fn is_rate_limited(&self) -> bool;
}

impl Retryable for UplinkError {
    fn is_rate_limited(&self) -> bool {
        UplinkError::is_rate_limited(self)
    }
}

/// Longest single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Growth factor applied after every retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(4000),
            multiplier: 2.5,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            multiplier,
        }
    }

    /// The sleep taken before each retry, in order. Growth saturates at
    /// `MAX_BACKOFF`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let multiplier = self.multiplier;
        std::iter::successors(Some(self.initial_delay.min(MAX_BACKOFF)), move |d| {
            let next = Duration::try_from_secs_f64(d.as_secs_f64() * multiplier)
                .unwrap_or(MAX_BACKOFF);
            Some(next.min(MAX_BACKOFF))
        })
        .take(self.max_retries as usize)
    }

    /// Run `op` until it succeeds, fails with a non-quota error, or the retry
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delays = self.delays();
        loop {
            let err = match op().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            if !err.is_rate_limited() {
                return Err(err);
            }
            let Some(delay) = delays.next() else {
                return Err(err);
            };
            counter!("uplink_retries_total").increment(1);
            warn!(
                target: "uplink",
                op = label,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "uplink congested, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// `RetryPolicy::default()` shorthand: 3 retries, 4 s initial delay, x2.5.
pub async fn with_retry<T, E, F, Fut>(label: &str, op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryPolicy::default().run(label, op).await
}
