//! Bounded retry with exponential backoff
//!
//! Connectivity failures are retried a small, configured number of times
//! with exponential backoff and jitter; any other error, and a
//! connectivity error that persists past the budget, propagates to the
//! caller as fatal.

use crate::config::RetryConfig;
use crate::domain::{Result, VeilError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Run `operation`, retrying on [`VeilError::Connectivity`].
///
/// # Examples
///
/// ```rust,no_run
/// use veil::adapters::retry::with_retry;
/// use veil::config::RetryConfig;
///
/// # async fn example() -> veil::domain::Result<()> {
/// let retry = RetryConfig::default();
/// let rows = with_retry(&retry, "fetch patient rows", || async {
///     // source read that may hit a transient network failure
///     Ok::<_, veil::domain::VeilError>(vec![1, 2, 3])
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<T, F, Fut>(retry: &RetryConfig, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay_ms = retry.initial_delay_ms;

    for attempt in 0..=retry.max_retries {
        match f().await {
            Ok(value) => return Ok(value),
            Err(VeilError::Connectivity(reason)) if attempt < retry.max_retries => {
                let jitter = rand::thread_rng().gen_range(0..=delay_ms / 4 + 1);
                let sleep_for = Duration::from_millis(delay_ms + jitter);
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = retry.max_retries,
                    delay_ms = sleep_for.as_millis() as u64,
                    reason = %reason,
                    "Transient connectivity failure, retrying"
                );
                tokio::time::sleep(sleep_for).await;
                delay_ms = ((delay_ms as f64) * retry.backoff_multiplier) as u64;
                delay_ms = delay_ms.min(retry.max_delay_ms);
            }
            Err(err) => return Err(err),
        }
    }

    // The loop either returns a success or propagates the final error
    unreachable!("retry loop always returns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let result = with_retry(&fast_retry(), "op", || async { Ok::<_, VeilError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = with_retry(&fast_retry(), "op", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(VeilError::Connectivity("socket reset".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_failure_is_fatal() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<i32> = with_retry(&fast_retry(), "op", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(VeilError::Connectivity("still down".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(VeilError::Connectivity(_))));
        // Initial attempt plus max_retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_connectivity_errors_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<i32> = with_retry(&fast_retry(), "op", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(VeilError::Database("constraint violation".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(VeilError::Database(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
