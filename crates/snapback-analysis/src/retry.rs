//! Retry with exponential backoff and jitter (§4.7, §9): the middle layer
//! between the deadline timeout and the circuit breaker.

use rand::Rng;
use std::time::Duration;

pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryConfig {
    pub fn from_upstream(
        max_attempts: u32,
        base_backoff_ms: u64,
        max_backoff_ms: u64,
    ) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::from_millis(base_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_backoff.as_millis().saturating_mul(1u128 << attempt.min(20));
        let capped = exp.min(self.max_backoff.as_millis());
        let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
        Duration::from_millis(jittered as u64)
    }
}

/// A failure classified as either worth retrying or terminal. Validation
/// failures and other non-transient errors should be classified `Fatal` so
/// a bad response doesn't waste attempts against a breaker that would
/// otherwise stay closed.
pub enum Classified<E> {
    Retryable(E),
    Fatal(E),
}

pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    mut attempt_fn: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, Classified<E>>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(Classified::Fatal(e)) => return Err(e),
            Err(Classified::Retryable(e)) => {
                last_err = Some(e);
                if attempt + 1 < config.max_attempts {
                    tokio::time::sleep(config.delay_for(attempt)).await;
                }
            }
        }
    }
    Err(last_err.expect("max_attempts >= 1 guarantees at least one iteration"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_on_first_try_without_sleeping() {
        let config = RetryConfig::from_upstream(3, 1, 10);
        let result: Result<u32, &str> =
            retry_with_backoff(&config, |_attempt| async { Ok::<_, Classified<&str>>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_until_success_within_attempt_budget() {
        let config = RetryConfig::from_upstream(3, 1, 10);
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(&config, |_attempt| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Classified::Retryable("transient"))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_error_short_circuits_without_retry() {
        let config = RetryConfig::from_upstream(3, 1, 10);
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(&config, |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Classified::Fatal("bad shape")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let config = RetryConfig::from_upstream(2, 1, 10);
        let result: Result<u32, &str> =
            retry_with_backoff(&config, |_attempt| async { Err(Classified::Retryable("down")) })
                .await;
        assert_eq!(result.unwrap_err(), "down");
    }
}
