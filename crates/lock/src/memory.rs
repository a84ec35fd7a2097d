//! In-memory lock store for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{LockError, LockStore, Result};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory lock store with TTL expiry.
///
/// Provides the same semantics as [`RedisLockStore`](crate::RedisLockStore)
/// within one process. Expiry uses tokio's clock so tests can pause time.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryLockStore {
    /// Creates a new empty lock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns true if `key` is currently held (and not expired).
    pub async fn is_held(&self, key: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Returns the number of unexpired keys.
    pub async fn held_count(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LockError::StoreUnavailable(
                "in-memory lock store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.check_available()?;

        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.get(key)
            && existing.expires_at > now
        {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool> {
        self.check_available()?;

        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at <= now => {
                entries.remove(key);
                Ok(false)
            }
            Some(entry) if entry.value == value => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
