use domain::{LedgerError, StockLevels};
use lock::LockError;
use store::StoreError;
use thiserror::Error;

/// Errors returned by the inventory ledger service.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Input rejected before any lock was taken.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A ledger guard refused the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The product lock could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Reading or writing the ledger row failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Unchanged counters attached to a guard failure.
    pub fn levels(&self) -> Option<StockLevels> {
        match self {
            InventoryError::Ledger(e) => e.levels(),
            _ => None,
        }
    }

    /// Short label used for the `outcome` metric label.
    pub fn outcome(&self) -> &'static str {
        match self {
            InventoryError::Validation(_) => "invalid",
            InventoryError::Ledger(LedgerError::ProductNotFound(_)) => "not_found",
            InventoryError::Ledger(LedgerError::InsufficientStock { .. }) => "insufficient_stock",
            InventoryError::Ledger(LedgerError::InsufficientReserved { .. }) => {
                "insufficient_reserved"
            }
            InventoryError::Ledger(_) => "invalid",
            InventoryError::Lock(LockError::AcquisitionFailed { .. }) => "lock_contended",
            InventoryError::Lock(LockError::StoreUnavailable(_)) => "lock_unavailable",
            InventoryError::Store(_) => "store_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
