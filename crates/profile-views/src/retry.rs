use std::future::Future;
use std::time::Duration;

use identity_client::IdentityError;
use tracing::warn;

use crate::error::ViewError;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// `initial * 2^(attempt - 1)`, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { initial, max } => {
                let factor = 1u32 << attempt.saturating_sub(1).min(31);
                initial.saturating_mul(factor).min(*max)
            }
        }
    }
}

/// Retry budget for identity provider calls. Only transient failures are
/// retried; everything else is returned on the first attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ATTEMPTS,
            backoff: Backoff::Exponential {
                initial: DEFAULT_INITIAL_BACKOFF,
                max: DEFAULT_MAX_BACKOFF,
            },
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
        }
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ViewError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IdentityError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(IdentityError::Transient(message)) if attempt < max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Identity call failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(IdentityError::Transient(message)) => {
                    return Err(ViewError::TransientUpstreamFailure {
                        attempts: attempt,
                        message,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Backoff::Fixed(Duration::from_millis(1)),
        }
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(2),
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(6), Duration::from_secs(2));
        assert_eq!(backoff.delay(60), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = quick(3)
            .run("get_by_uid", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(IdentityError::Transient("timeout".to_string()))
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_reports_attempts() {
        let calls = AtomicU32::new(0);
        let err = quick(3)
            .run("get_by_uid", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(IdentityError::Transient("503".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ViewError::TransientUpstreamFailure { attempts: 3, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = quick(5)
            .run("get_by_username", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(IdentityError::NotFound("ghost".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ViewError::IdentityNotFound(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff: Backoff::None,
        };
        let _ = policy
            .run("get_by_uid", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(IdentityError::Transient("reset".to_string()))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
