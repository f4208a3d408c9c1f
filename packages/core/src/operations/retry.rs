//! Retry with exponential backoff for idempotent reads
//!
//! Layer and sync fetches can be repeated safely, so a timeout or dropped
//! connection on those is retried a bounded number of times. Transactions
//! are never passed through here: a timed-out submission may already have
//! been applied, and replaying it would create duplicate nodes.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use mew_clipper_core::operations::RetryPolicy;
//! # use mew_clipper_core::transport::GraphStore;
//! # async fn example(store: &dyn GraphStore) -> Result<(), Box<dyn std::error::Error>> {
//! let ids = vec!["user-root-id-XYZ".to_string()];
//! let layer = RetryPolicy::default()
//!     .run("fetch layer", || store.fetch_layer(&ids))
//!     .await?;
//! # let _ = layer;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::transport::TransportError;

/// Bounded retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: usize,
    /// Delay before the first retry, doubled for each following one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!("{} succeeded after {} retry(ies)", label, attempt);
                    }
                    return Ok(value);
                }

                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    tracing::debug!(
                        "{} failed on attempt {}/{}: {}. Retrying in {:?}",
                        label,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }

                Err(e) => {
                    if e.is_retryable() && self.max_retries > 0 {
                        tracing::warn!("Max retries ({}) exceeded for {}", self.max_retries, label);
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        assert_eq!(policy.backoff(0), Duration::from_millis(10));
        assert_eq!(policy.backoff(1), Duration::from_millis(20));
        assert_eq!(policy.backoff(2), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result = policy
            .run("fetch", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TransportError::timeout("slow"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(1));

        let result: Result<(), _> = policy
            .run("fetch", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::network("connection refused")) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind, TransportErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_status_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1));

        let result: Result<(), _> = policy
            .run("fetch", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::http_status(500, "boom")) }
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = RetryPolicy::none()
            .run("fetch", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::timeout("slow")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
