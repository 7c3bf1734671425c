//! Retry harness composing [`ExponentialBackoff`] with a should-retry
//! predicate around a single attempt operation.

use crate::backoff::ExponentialBackoff;
use crate::sleeper::{Sleeper, TokioSleeper};
use std::future::Future;
use std::sync::Arc;

/// Configuration for [`retry`].
pub struct RetryConfig<E> {
    /// Total attempts allowed; `retries == 0` disables retries (one
    /// attempt only).
    pub retries: usize,
    pub backoff: ExponentialBackoff,
    /// Defaults to "retry on any error"; pass a stricter predicate to
    /// short-circuit, e.g. on non-retryable 4xx responses.
    pub should_retry: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl<E> RetryConfig<E> {
    pub fn new(retries: usize, backoff: ExponentialBackoff) -> Self {
        Self {
            retries,
            backoff,
            should_retry: Arc::new(|_| true),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

/// Runs `operation(attempt)` (1-indexed) until it succeeds, the retry
/// predicate rejects the error, or `retries` is exhausted. The final error
/// returned is always the one that terminated the last attempt.
pub async fn retry<T, E, Fut, Op>(config: &RetryConfig<E>, mut operation: Op) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    Op: FnMut(usize) -> Fut,
{
    let max_attempts = config.retries + 1;
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let is_last = attempt == max_attempts;
                if is_last || !(config.should_retry)(&err) {
                    return Err(err);
                }
                config.sleeper.sleep(config.backoff.next_delay()).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::{InstantSleeper, TrackingSleeper};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn backoff(initial_ms: u64) -> ExponentialBackoff {
        ExponentialBackoff::builder(Duration::from_millis(initial_ms)).factor(2.0).build().unwrap()
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let config = RetryConfig::new(3, backoff(10)).with_sleeper(Arc::new(InstantSleeper));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<i32, &str> = retry(&config, |_attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let config = RetryConfig::new(5, backoff(10)).with_sleeper(Arc::new(InstantSleeper));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<i32, &str> = retry(&config, |_attempt| {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_zero_disables_retry() {
        let config = RetryConfig::new(0, backoff(10)).with_sleeper(Arc::new(InstantSleeper));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<i32, &str> = retry(&config, |_attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("always fails")
            }
        })
        .await;
        assert_eq!(result, Err("always fails"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn final_error_is_last_attempts_error() {
        let config = RetryConfig::new(2, backoff(10)).with_sleeper(Arc::new(InstantSleeper));
        let result: Result<i32, String> =
            retry(&config, |attempt| async move { Err(format!("fail-{attempt}")) }).await;
        assert_eq!(result, Err("fail-3".to_string()));
    }

    #[tokio::test]
    async fn should_retry_predicate_short_circuits() {
        let config = RetryConfig::new(5, backoff(10))
            .with_sleeper(Arc::new(InstantSleeper))
            .should_retry(|e: &&str| *e == "retryable");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<i32, &str> = retry(&config, |_attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal")
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backoff_pacing_matches_scenario_6() {
        // retries=3, initial=200ms, factor=2, no jitter: delays 200, 400, 800.
        let sleeper = TrackingSleeper::new();
        let config = RetryConfig::new(3, backoff(200)).with_sleeper(Arc::new(sleeper.clone()));
        let result: Result<(), &str> = retry(&config, |_attempt| async { Err("fail") }).await;
        assert!(result.is_err());
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(200), Duration::from_millis(400), Duration::from_millis(800)]
        );
    }

    #[tokio::test]
    async fn success_on_final_attempt_sleeps_only_between_failures() {
        let sleeper = TrackingSleeper::new();
        let config = RetryConfig::new(3, backoff(200)).with_sleeper(Arc::new(sleeper.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<&str, &str> = retry(&config, |attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err("fail")
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(sleeper.calls().len(), 2);
    }
}
