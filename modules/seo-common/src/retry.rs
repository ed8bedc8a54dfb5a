use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Exponential backoff without jitter: `base * 2^(k-1)` after the k-th failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after the `attempt`-th (1-indexed) failure.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Failure classification consulted by the retry loop.
pub trait Retryable {
    fn is_retriable(&self) -> bool;
}

/// The last error seen once the loop gives up, with the number of attempts made.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub error: E,
}

/// Run `op` until it succeeds, returns a non-retriable error, or the policy's
/// attempt budget is spent. `op` receives the 1-indexed attempt number.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                debug!(label, attempt, "Upstream call succeeded");
                return Ok(value);
            }
            Err(error) => {
                if !error.is_retriable() || attempt >= max_attempts {
                    warn!(label, attempt, max_attempts, error = %error, "Giving up on upstream call");
                    return Err(RetryExhausted {
                        attempts: attempt,
                        error,
                    });
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Upstream call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Flaky {
        retriable: bool,
    }

    impl Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky (retriable={})", self.retriable)
        }
    }

    impl Retryable for Flaky {
        fn is_retriable(&self) -> bool {
            self.retriable
        }
    }

    fn within(actual: Duration, expected: Duration) -> bool {
        actual >= expected && actual < expected + Duration::from_millis(5)
    }

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), u32::MAX);
        assert!(policy.delay_after(200) >= Duration::from_secs(1 << 31));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures_with_exponential_waits() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let start = tokio::time::Instant::now();

        let result = retry_with_backoff(&policy, "test", |attempt| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push((attempt, start.elapsed()));
                if attempt <= 2 {
                    Err(Flaky { retriable: true })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, 1);
        assert_eq!(seen[0].1, Duration::ZERO);
        assert_eq!(seen[1].0, 2);
        assert!(within(seen[1].1, Duration::from_millis(100)));
        assert_eq!(seen[2].0, 3);
        assert!(within(seen[2].1, Duration::from_millis(300)));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_and_returns_last_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let calls = Arc::new(Mutex::new(0u32));

        let result: Result<(), _> = retry_with_backoff(&policy, "test", |_| {
            let calls = calls.clone();
            async move {
                *calls.lock().unwrap() += 1;
                Err(Flaky { retriable: true })
            }
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 4);
        assert!(exhausted.error.retriable);
        assert_eq!(*calls.lock().unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retriable_error_stops_immediately() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let start = tokio::time::Instant::now();

        let result: Result<(), _> =
            retry_with_backoff(&policy, "test", |_| async { Err(Flaky { retriable: false }) }).await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retry_budget_makes_a_single_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let result: Result<(), _> =
            retry_with_backoff(&policy, "test", |_| async { Err(Flaky { retriable: true }) }).await;
        assert_eq!(result.unwrap_err().attempts, 1);
    }
}
