use std::time::Duration;

use thiserror::Error;

use crate::riot_api::ApiError;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (1-based): base * 2^(attempt-1), capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Upper bound on time spent sleeping before the final failure.
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts.max(1))
            .map(|attempt| self.delay_after(attempt))
            .sum()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{what} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        what: String,
        attempts: u32,
        #[source]
        last: ApiError,
    },
    #[error("{what} rejected: {source}")]
    Rejected {
        what: String,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs `op` until it succeeds, hits a non-retryable error, or the policy's
/// attempts are used up. `op` receives the 1-based attempt number.
pub fn retry_with_backoff<T, F>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Result<T, ApiError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => {
                return Err(FetchError::Rejected {
                    what: what.to_string(),
                    source: err,
                });
            }
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(FetchError::Exhausted {
                        what: what.to_string(),
                        attempts: attempt,
                        last: err,
                    });
                }
                let delay = next_delay(policy, attempt, &err);
                log::warn!(
                    "{what} failed (attempt {attempt}/{max_attempts}): {err}; retrying in {}ms",
                    delay.as_millis()
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
        }
    }
}

/// Backoff for `attempt`, stretched to the server's Retry-After hint but never
/// past `max_delay`.
fn next_delay(policy: &RetryPolicy, attempt: u32, err: &ApiError) -> Duration {
    let delay = policy.delay_after(attempt);
    match err.retry_after() {
        Some(hint) => delay.max(hint.min(policy.max_delay)),
        None => delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        // 100 + 200 + 400 + 500 + 500
        assert_eq!(policy.total_delay(), Duration::from_millis(1700));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let out = retry_with_backoff(&RetryPolicy::immediate(4), "match list", |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(ApiError::Transport("connection reset".to_string()))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn reports_exhausted_after_max_attempts() {
        let mut calls = 0;
        let err = retry_with_backoff(&RetryPolicy::immediate(3), "match 42", |_| -> Result<(), _> {
            calls += 1;
            Err(ApiError::Status {
                status: 503,
                retry_after: None,
                body: "unavailable".to_string(),
            })
        })
        .unwrap_err();
        assert_eq!(calls, 3);
        match err {
            FetchError::Exhausted { attempts, what, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(what, "match 42");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn client_errors_are_not_retried() {
        let mut calls = 0;
        let err = retry_with_backoff(&RetryPolicy::immediate(5), "summoner", |_| -> Result<(), _> {
            calls += 1;
            Err(ApiError::Status {
                status: 403,
                retry_after: None,
                body: "forbidden".to_string(),
            })
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, FetchError::Rejected { .. }));
    }

    fn rate_limited(retry_after: Option<Duration>) -> ApiError {
        ApiError::Status {
            status: 429,
            retry_after,
            body: "rate limit exceeded".to_string(),
        }
    }

    #[test]
    fn retry_after_hint_stretches_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        };
        let hinted = |secs| rate_limited(Some(Duration::from_secs(secs)));
        assert_eq!(next_delay(&policy, 1, &rate_limited(None)), Duration::from_millis(100));
        assert_eq!(next_delay(&policy, 1, &hinted(1)), Duration::from_secs(1));
        assert_eq!(next_delay(&policy, 1, &hinted(30)), Duration::from_secs(2));
        // A hint shorter than the backoff does not shorten it.
        assert_eq!(next_delay(&policy, 5, &hinted(1)), Duration::from_millis(1600));
    }

    #[test]
    fn waits_for_retry_after_before_next_attempt() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::ZERO,
            max_delay: Duration::from_millis(40),
        };
        let started = std::time::Instant::now();
        let out = retry_with_backoff(&policy, "match list", |attempt| {
            if attempt == 1 {
                Err(rate_limited(Some(Duration::from_secs(60))))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        let elapsed = started.elapsed();
        assert_eq!(out, 2);
        assert!(elapsed >= Duration::from_millis(40), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "{elapsed:?}");
    }
}
