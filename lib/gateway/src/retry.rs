//! Bounded retries for upstream calls

use countrysim_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How often an upstream call is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first, at least 1
    pub attempts: u32,
    /// Wait before the second attempt, doubled for each later one
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Quick retries for batch work such as embedding refresh
    pub fn for_transient_errors() -> Self {
        Self {
            attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Single attempt. Request-path calls use this and rely on the fallback.
    pub fn no_retry() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (1-based), plus up to 25% jitter
    fn backoff(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(16);
        let capped = self.base_delay.saturating_mul(1 << doublings).min(self.max_delay);
        capped.mul_f64(1.0 + 0.25 * rand::random::<f64>())
    }
}

fn is_transient(error: &Error) -> bool {
    matches!(error, Error::UpstreamUnavailable(_) | Error::Io(_))
}

/// Run `operation` until it succeeds, fails with an error that is not
/// transient, or runs out of attempts. The last error is returned.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_transient(&e) => {
                let delay = config.backoff(attempt);
                warn!(operation = operation_name, attempt, attempts, ?delay, "transient failure: {}", e);
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig::for_transient_errors();
        for _ in 0..20 {
            let first = config.backoff(1);
            assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));

            let third = config.backoff(3);
            assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(500));

            let late = config.backoff(40);
            assert!(late >= Duration::from_secs(5) && late <= Duration::from_millis(6250));
        }
        assert_eq!(RetryConfig::no_retry().backoff(1), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = with_retry(&fast(), "flaky", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::UpstreamUnavailable("503".into()))
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
    async fn test_gives_up_after_last_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = with_retry(&fast(), "down", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::UpstreamUnavailable("down".into()))
            }
        })
        .await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = with_retry(&RetryConfig::for_transient_errors(), "bad input", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::NotFound("x".into()))
            }
        })
        .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_is_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = with_retry(&RetryConfig::no_retry(), "once", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::UpstreamUnavailable("down".into()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
