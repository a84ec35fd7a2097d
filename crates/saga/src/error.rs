//! Saga error types.

use common::OrderKind;
use domain::{SequenceError, TransitionError};
use lock::LockError;
use store::StoreError;
use thiserror::Error;

use crate::services::LedgerRefusal;

/// Errors returned by the order lifecycle services.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Input rejected before any call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No order with that id or number.
    #[error("{kind} order not found: {reference}")]
    OrderNotFound { kind: OrderKind, reference: String },

    /// The requested status change is not an edge of the graph.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The ledger refused the step; nothing was committed.
    #[error("Ledger refused {step}: {}", refusal.message)]
    LedgerRefused {
        step: &'static str,
        refusal: LedgerRefusal,
        current_status: Option<String>,
    },

    /// The ledger could not be reached or failed; nothing was committed.
    #[error("Upstream call failed during {step}: {reason}")]
    UpstreamCallFailed {
        step: &'static str,
        reason: String,
        current_status: Option<String>,
    },

    /// An earlier step took effect but the order row or its history entry
    /// could not be written.
    ///
    /// The ledger and the order may now disagree and need manual
    /// reconciliation.
    #[error("Step {step} applied for {order_ref} but the order write failed: {reason}")]
    StatusWriteFailed {
        order_ref: String,
        step: &'static str,
        reason: String,
        current_status: Option<String>,
    },

    /// The order number sequence could not issue a number.
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// The order lock could not be taken; nothing was attempted.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A repository call failed before any ledger side effect.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SagaError {
    /// Status the order is known to be in after the failure, if any.
    pub fn current_status(&self) -> Option<&str> {
        match self {
            SagaError::Transition(TransitionError::InvalidTransition { from, .. }) => Some(from),
            SagaError::LedgerRefused { current_status, .. }
            | SagaError::UpstreamCallFailed { current_status, .. }
            | SagaError::StatusWriteFailed { current_status, .. } => current_status.as_deref(),
            _ => None,
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
