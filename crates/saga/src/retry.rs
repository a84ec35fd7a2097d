//! Retry policy for order writes that follow a ledger side effect.

use std::future::Future;
use std::time::Duration;

use store::StoreError;

use crate::error::SagaError;

/// How often a status write is retried after the ledger step succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWritePolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Pause between attempts, multiplied by the attempt number.
    pub backoff: Duration,
}

impl Default for StatusWritePolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl StatusWritePolicy {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }

    /// Runs `write` until it succeeds, fails permanently or the attempts are
    /// used up.
    ///
    /// Conflicts, missing rows and duplicate numbers are permanent.
    pub async fn run<T, F, Fut>(&self, what: &'static str, mut write: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match write().await {
                Ok(value) => return Ok(value),
                Err(
                    e @ (StoreError::StatusConflict { .. }
                    | StoreError::NotFound { .. }
                    | StoreError::DuplicateOrderNumber(_)),
                ) => return Err(e),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(what, attempt, attempts, error = %e, "order write failed; retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Reports an order write that failed after `step` took effect.
///
/// Nothing is compensated; the failure is logged, counted and returned so the
/// caller sees the inconsistency.
pub(crate) fn status_write_failed(
    order_ref: &str,
    step: &'static str,
    error: StoreError,
    current_status: Option<String>,
) -> SagaError {
    metrics::counter!("saga_status_write_failed_total", "step" => step).increment(1);
    tracing::error!(
        order_ref,
        step,
        error = %error,
        "order write failed after a ledger step; manual reconciliation required"
    );
    SagaError::StatusWriteFailed {
        order_ref: order_ref.to_string(),
        step,
        reason: error.to_string(),
        current_status,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use common::OrderId;

    use super::*;

    fn policy(attempts: u32) -> StatusWritePolicy {
        StatusWritePolicy {
            attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = policy(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Unavailable("down".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), _> = policy(2)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Unavailable("down".into()))
            })
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), _> = policy(5)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::StatusConflict {
                    order_id: OrderId::new(1),
                    expected: "Pending".into(),
                    actual: "Approved".into(),
                })
            })
            .await;

        assert!(matches!(result, Err(StoreError::StatusConflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = policy(0)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StoreError>(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
