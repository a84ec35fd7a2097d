//! Per-order mutual exclusion for ledger-guarded transitions.
//!
//! The conditional status write only detects a lost race after the ledger
//! call has already been applied. Holding `order:lock:<kind>:<id>` across
//! load, check, ledger call and commit keeps a second request for the same
//! order from repeating the stock step.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::{OrderId, OrderKind};
use lock::{InMemoryLockStore, LockService, LockStore};

use crate::error::Result;

/// Default TTL of an order lock: one ledger call plus the status write.
pub const DEFAULT_ORDER_LOCK_TTL: Duration = Duration::from_secs(10);

/// Lock key guarding one order.
pub fn order_lock_key(kind: OrderKind, id: OrderId) -> String {
    let kind = match kind {
        OrderKind::Application => "application",
        OrderKind::Fulfillment => "fulfillment",
    };
    format!("order:lock:{kind}:{id}")
}

/// Serializes ledger-guarded transitions per order.
///
/// Contention is not waited on: the second caller fails with
/// `LockError::AcquisitionFailed` and may resubmit.
#[derive(Clone)]
pub struct OrderLocks {
    locks: LockService<Arc<dyn LockStore>>,
    ttl: Duration,
}

impl OrderLocks {
    pub fn new(store: Arc<dyn LockStore>, ttl: Duration) -> Self {
        Self {
            locks: LockService::new(store),
            ttl,
        }
    }

    /// Locks held only within this process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryLockStore::new()), DEFAULT_ORDER_LOCK_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Runs `operation` while holding the lock of one order.
    pub(crate) async fn run<T, F, Fut>(&self, kind: OrderKind, id: OrderId, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.locks
            .with_lock(&order_lock_key(kind, id), self.ttl, operation)
            .await
    }
}

impl std::fmt::Debug for OrderLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLocks").field("ttl", &self.ttl).finish()
    }
}
