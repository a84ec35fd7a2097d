//! The lock primitive: acquire and release a named, time-bounded token.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::{LockStore, Result};

/// Proof of ownership of a held lock.
///
/// The random `value` is what the store compares on release, so a holder
/// can only ever release its own acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    key: String,
    value: String,
    ttl: Duration,
    acquired_at: Instant,
}

impl LockToken {
    /// Returns the lock key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the opaque token value stored under the key.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the TTL the lock was acquired with.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns how long ago the lock was acquired.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Returns true if the TTL has elapsed since acquisition.
    ///
    /// This is a local estimate; the store remains authoritative.
    pub fn is_expired(&self) -> bool {
        self.held_for() >= self.ttl
    }
}

/// Named mutual exclusion against a shared [`LockStore`].
#[derive(Debug, Clone)]
pub struct DistributedLock<S> {
    store: S,
}

impl<S: LockStore> DistributedLock<S> {
    /// Creates a lock primitive over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tries once to acquire `key` for `ttl`.
    ///
    /// Returns `Ok(None)` when another caller holds the key and
    /// `Err(StoreUnavailable)` when the store cannot be reached; in neither
    /// case is the lock held.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockToken>> {
        let value = Uuid::new_v4().to_string();

        let acquired = self.store.set_if_absent(key, &value, ttl).await.inspect_err(|e| {
            metrics::counter!("lock_acquire_total", "outcome" => "unavailable").increment(1);
            tracing::error!(key, error = %e, "lock store unavailable");
        })?;

        if !acquired {
            metrics::counter!("lock_acquire_total", "outcome" => "contended").increment(1);
            tracing::debug!(key, "lock contended");
            return Ok(None);
        }

        metrics::counter!("lock_acquire_total", "outcome" => "acquired").increment(1);
        tracing::trace!(key, "lock acquired");

        Ok(Some(LockToken {
            key: key.to_string(),
            value,
            ttl,
            acquired_at: Instant::now(),
        }))
    }

    /// Releases the lock identified by `token`.
    ///
    /// Returns false when the key no longer holds this token, e.g. after the
    /// TTL expired and another caller acquired it. Nothing is deleted then.
    pub async fn release(&self, token: &LockToken) -> Result<bool> {
        let released = self
            .store
            .delete_if_equals(&token.key, &token.value)
            .await?;

        metrics::histogram!("lock_hold_seconds").record(token.held_for().as_secs_f64());
        if !released {
            metrics::counter!("lock_lost_total").increment(1);
            tracing::warn!(
                key = %token.key,
                held_ms = token.held_for().as_millis() as u64,
                ttl_ms = token.ttl.as_millis() as u64,
                "lock no longer owned at release"
            );
        }

        Ok(released)
    }
}
