use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// A shared key-value store acting as lock authority.
///
/// The store entry is the only source of truth for who holds a lock;
/// implementations must not keep authoritative local state.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Stores `value` under `key` with the given TTL, only if `key` is absent.
    ///
    /// Returns false when the key already exists.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Deletes `key` only if it still holds `value`.
    ///
    /// The comparison and the delete must happen as one atomic step.
    /// Returns false when the key is missing or holds another value.
    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool>;
}

#[async_trait]
impl<T: LockStore + ?Sized> LockStore for Arc<T> {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        (**self).set_if_absent(key, value, ttl).await
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool> {
        (**self).delete_if_equals(key, value).await
    }
}
