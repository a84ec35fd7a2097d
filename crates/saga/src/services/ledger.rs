//! Ledger client trait and typed outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use domain::{StockLevels, StockStats};
use inventory::{LedgerOperation, LedgerRequest};

use crate::error::SagaError;

/// Why the ledger refused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalKind {
    ProductNotFound,
    InsufficientStock,
    InsufficientReserved,
    Invalid,
}

/// A guard failure reported by the ledger. Counters are unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRefusal {
    pub kind: RefusalKind,
    pub message: String,
    pub levels: Option<StockLevels>,
}

/// Result of one call across the ledger boundary.
///
/// Every call ends in exactly one of these; nothing is thrown across the
/// boundary, so callers must handle all three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome<T = StockLevels> {
    /// The ledger applied the change (or answered the query).
    Applied(T),
    /// A guard failure: the ledger is unchanged.
    Refused(LedgerRefusal),
    /// Transport error, timeout, malformed reply or ledger-side lock
    /// failure. Treated as failed, never as unknown.
    Unavailable(String),
}

impl<T> LedgerOutcome<T> {
    /// Label used for the `outcome` metric label.
    pub fn label(&self) -> &'static str {
        match self {
            LedgerOutcome::Applied(_) => "applied",
            LedgerOutcome::Refused(_) => "refused",
            LedgerOutcome::Unavailable(_) => "unavailable",
        }
    }

    /// Converts the outcome into a saga result for `step`.
    pub fn into_result(self, step: &'static str, current_status: Option<&str>) -> Result<T, SagaError> {
        match self {
            LedgerOutcome::Applied(value) => Ok(value),
            LedgerOutcome::Refused(refusal) => Err(SagaError::LedgerRefused {
                step,
                refusal,
                current_status: current_status.map(str::to_string),
            }),
            LedgerOutcome::Unavailable(reason) => Err(SagaError::UpstreamCallFailed {
                step,
                reason,
                current_status: current_status.map(str::to_string),
            }),
        }
    }
}

/// Access to the inventory ledger from the order service.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Applies one counter mutation.
    async fn apply(&self, operation: LedgerOperation, request: LedgerRequest) -> LedgerOutcome;

    /// Reads the stock figures of a product.
    async fn stats(&self, product_id: ProductId) -> LedgerOutcome<StockStats>;

    async fn reserve(&self, request: LedgerRequest) -> LedgerOutcome {
        self.apply(LedgerOperation::Reserve, request).await
    }

    async fn release(&self, request: LedgerRequest) -> LedgerOutcome {
        self.apply(LedgerOperation::Release, request).await
    }

    async fn confirm(&self, request: LedgerRequest) -> LedgerOutcome {
        self.apply(LedgerOperation::Confirm, request).await
    }

    async fn restock(&self, request: LedgerRequest) -> LedgerOutcome {
        self.apply(LedgerOperation::Restock, request).await
    }
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn apply(&self, operation: LedgerOperation, request: LedgerRequest) -> LedgerOutcome {
        (**self).apply(operation, request).await
    }

    async fn stats(&self, product_id: ProductId) -> LedgerOutcome<StockStats> {
        (**self).stats(product_id).await
    }
}
