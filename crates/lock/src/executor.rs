//! Lock-guarded execution of a unit of work.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;

use crate::{DistributedLock, LockError, LockStore, LockToken};

/// Runs operations while holding exactly one distributed lock.
///
/// There is no wait or retry loop: contention surfaces immediately as
/// [`LockError::AcquisitionFailed`] and callers decide whether to resubmit.
#[derive(Debug, Clone)]
pub struct LockService<S> {
    lock: DistributedLock<S>,
}

impl<S> LockService<S>
where
    S: LockStore + Clone + 'static,
{
    /// Creates a lock service over the given store.
    pub fn new(store: S) -> Self {
        Self {
            lock: DistributedLock::new(store),
        }
    }

    /// Returns the underlying lock primitive.
    pub fn lock(&self) -> &DistributedLock<S> {
        &self.lock
    }

    /// Acquires `key`, runs `operation` exactly once, then releases `key`.
    ///
    /// The lock is released whether the operation returns `Ok`, returns
    /// `Err` or panics; a panic is resumed after the release. If the
    /// returned future is dropped mid-flight the release is handed to a
    /// background task. A failed release is logged and never replaces the
    /// operation's own result.
    pub async fn with_lock<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let token = self
            .lock
            .acquire(key, ttl)
            .await?
            .ok_or_else(|| LockError::AcquisitionFailed {
                key: key.to_string(),
            })?;

        let mut guard = ReleaseOnDrop {
            store: self.lock.store().clone(),
            token: Some(token),
        };

        let outcome = AssertUnwindSafe(operation()).catch_unwind().await;

        if let Some(token) = guard.token.take()
            && let Err(e) = self.lock.release(&token).await
        {
            tracing::error!(key, error = %e, "failed to release lock; it will expire with its TTL");
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Releases the lock from a background task if `with_lock` is cancelled
/// before it reaches its own release.
struct ReleaseOnDrop<S: LockStore + Clone + 'static> {
    store: S,
    token: Option<LockToken>,
}

impl<S: LockStore + Clone + 'static> Drop for ReleaseOnDrop<S> {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = self.store.clone();
        handle.spawn(async move {
            if let Err(e) = store.delete_if_equals(token.key(), token.value()).await {
                tracing::warn!(key = token.key(), error = %e, "deferred lock release failed");
            }
        });
    }
}
