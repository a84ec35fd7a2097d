//! In-process ledger client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::ProductId;
use domain::{LedgerError, StockStats};
use inventory::{InventoryError, InventoryLedger, LedgerOperation, LedgerRequest};
use lock::LockStore;
use store::ProductRepository;

use super::ledger::{LedgerClient, LedgerOutcome, LedgerRefusal, RefusalKind};

/// Calls an [`InventoryLedger`] living in the same process.
///
/// Used by single-process deployments and tests. `set_unavailable` makes
/// every call fail as if the remote service were down.
pub struct LocalLedgerClient<R, S> {
    ledger: Arc<InventoryLedger<R, S>>,
    unavailable: Arc<AtomicBool>,
}

impl<R, S> Clone for LocalLedgerClient<R, S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            unavailable: self.unavailable.clone(),
        }
    }
}

impl<R, S> LocalLedgerClient<R, S> {
    pub fn new(ledger: Arc<InventoryLedger<R, S>>) -> Self {
        Self {
            ledger,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger<R, S>> {
        &self.ledger
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }
}

/// Maps an inventory error onto the three-way outcome.
pub(crate) fn outcome_from_error<T>(err: InventoryError) -> LedgerOutcome<T> {
    let kind = match &err {
        InventoryError::Ledger(LedgerError::ProductNotFound(_)) => RefusalKind::ProductNotFound,
        InventoryError::Ledger(LedgerError::InsufficientStock { .. }) => {
            RefusalKind::InsufficientStock
        }
        InventoryError::Ledger(LedgerError::InsufficientReserved { .. }) => {
            RefusalKind::InsufficientReserved
        }
        InventoryError::Ledger(LedgerError::InconsistentCounters { .. }) => {
            return LedgerOutcome::Unavailable(err.to_string());
        }
        InventoryError::Ledger(_) | InventoryError::Validation(_) => RefusalKind::Invalid,
        InventoryError::Lock(_) | InventoryError::Store(_) => {
            return LedgerOutcome::Unavailable(err.to_string());
        }
    };
    LedgerOutcome::Refused(LedgerRefusal {
        kind,
        levels: err.levels(),
        message: err.to_string(),
    })
}

#[async_trait]
impl<R, S> LedgerClient for LocalLedgerClient<R, S>
where
    R: ProductRepository,
    S: LockStore + Clone + 'static,
{
    async fn apply(&self, operation: LedgerOperation, request: LedgerRequest) -> LedgerOutcome {
        if self.is_unavailable() {
            return LedgerOutcome::Unavailable("ledger marked unavailable".to_string());
        }
        match self
            .ledger
            .apply(
                operation,
                request.product_id,
                request.quantity,
                &request.order_ref,
            )
            .await
        {
            Ok(levels) => LedgerOutcome::Applied(levels),
            Err(e) => outcome_from_error(e),
        }
    }

    async fn stats(&self, product_id: ProductId) -> LedgerOutcome<StockStats> {
        if self.is_unavailable() {
            return LedgerOutcome::Unavailable("ledger marked unavailable".to_string());
        }
        match self.ledger.stats(product_id).await {
            Ok(stats) => LedgerOutcome::Applied(stats),
            Err(e) => outcome_from_error(e),
        }
    }
}
