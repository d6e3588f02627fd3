//! Per-backend retry wrapper.
//!
//! # Retry policy
//!
//! - **Generic failures** (network, status, parse): sleep the fixed
//!   [`RetryPolicy::retry_delay`] and try again.
//! - **Rate-limited failures**: sleep `rate_limit_base * 2^attempt + jitter`
//!   (0-based attempt, jitter drawn from `0..=rate_limit_jitter`).
//! - **Missing credentials**: give up at once, the key will not appear.
//!
//! No sleep follows the final attempt. An empty result list is a valid
//! answer and is returned without retrying.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::backend::SearchBackend;
use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::error::SearchError;
use crate::types::SearchResult;

impl RetryPolicy {
    /// Delay before the attempt following failed attempt `attempt` (0-based).
    ///
    /// `jitter_sample` is clamped to [`rate_limit_jitter`](Self::rate_limit_jitter)
    /// and only applies to rate-limited errors.
    pub fn delay_for(
        &self,
        attempt: u32,
        error: &SearchError,
        jitter_sample: Duration,
    ) -> Duration {
        if error.is_rate_limited() {
            let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
            self.rate_limit_base
                .saturating_mul(factor)
                .saturating_add(jitter_sample.min(self.rate_limit_jitter))
        } else {
            self.retry_delay
        }
    }

    fn sample_jitter(&self) -> Duration {
        let max = u64::try_from(self.rate_limit_jitter.as_millis()).unwrap_or(u64::MAX);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

/// One failed attempt against a backend.
#[derive(Debug)]
pub struct AttemptFailure {
    /// 1-based attempt number.
    pub attempt: u32,
    pub error: SearchError,
}

/// Every attempt against a backend failed.
#[derive(Debug)]
pub struct RetryExhausted {
    /// Failures in attempt order. Never empty.
    pub failures: Vec<AttemptFailure>,
}

impl RetryExhausted {
    /// The error of the final attempt.
    pub fn last_error(&self) -> Option<&SearchError> {
        self.failures.last().map(|f| &f.error)
    }
}

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.last() {
            Some(last) => write!(
                f,
                "failed after {} attempt(s): {}",
                self.failures.len(),
                last.error
            ),
            None => f.write_str("failed without attempting"),
        }
    }
}

impl std::error::Error for RetryExhausted {}

/// Call `backend` up to `policy.max_attempts` times.
///
/// # Errors
///
/// Returns [`RetryExhausted`] with one entry per failed attempt once the
/// attempts run out, or immediately for a non-retryable error.
pub async fn with_retry(
    backend: &dyn SearchBackend,
    query: &str,
    policy: &RetryPolicy,
    clock: &dyn Clock,
) -> Result<Vec<SearchResult>, RetryExhausted> {
    let max_attempts = policy.max_attempts.max(1);
    let mut failures = Vec::new();

    for attempt in 0..max_attempts {
        match backend.search(query).await {
            Ok(results) => {
                debug!(
                    backend = backend.name(),
                    attempt = attempt + 1,
                    count = results.len(),
                    "backend answered"
                );
                return Ok(results);
            }
            Err(error) => {
                warn!(
                    backend = backend.name(),
                    attempt = attempt + 1,
                    max_attempts,
                    error = %error,
                    "backend attempt failed"
                );

                let retryable = error.is_retryable();
                let delay = policy.delay_for(attempt, &error, policy.sample_jitter());
                failures.push(AttemptFailure {
                    attempt: attempt + 1,
                    error,
                });

                if !retryable || attempt + 1 == max_attempts {
                    break;
                }

                debug!(
                    backend = backend.name(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "waiting before retry"
                );
                clock.sleep(delay).await;
            }
        }
    }

    Err(RetryExhausted { failures })
}
