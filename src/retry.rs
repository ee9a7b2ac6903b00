//! Bounded exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::Result;

/// Retry settings applied to embedding and completion calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Builds a policy; `max_attempts` counts the first call and is clamped to at least one.
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.base_delay
            .checked_mul(1 << capped)
            .unwrap_or(Duration::MAX)
    }

    /// Runs `op` until it succeeds, fails permanently or exhausts the attempt budget.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0usize;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying transient failure"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(8, Duration::from_millis(10));
        assert_eq!(policy.backoff(1), Duration::from_millis(20));
        assert_eq!(policy.backoff(2), Duration::from_millis(40));
        assert_eq!(policy.backoff(5), Duration::from_millis(320));
        assert_eq!(policy.backoff(9), Duration::from_millis(320));
    }

    #[test]
    fn huge_base_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(3, Duration::from_millis(u64::MAX));
        assert_eq!(policy.backoff(1), Duration::MAX);
        assert_eq!(policy.backoff(5), Duration::MAX);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let value = policy
            .run("flaky", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RagError::RateLimited("429".into()))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let err = policy
            .run("down", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RagError::transient("503"))
            })
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let err = RetryPolicy::default()
            .run("config", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RagError::Config("bad key".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
