//! Domain error types.

use common::{OrderKind, ProductId};
use thiserror::Error;

use crate::ledger::StockLevels;

/// Guard failures of ledger operations.
///
/// Every variant that concerns an existing product carries the unchanged
/// counters so callers can report them without re-reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No ledger row exists for the product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Not enough available stock to reserve.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {}",
        levels.available_stock
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        levels: StockLevels,
    },

    /// Not enough reserved stock to release or confirm.
    #[error(
        "Insufficient reserved stock for product {product_id}: requested {requested}, reserved {}",
        levels.reserved_stock
    )]
    InsufficientReserved {
        product_id: ProductId,
        requested: u32,
        levels: StockLevels,
    },

    /// Quantity must be greater than zero.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Restocking would overflow the counters.
    #[error("Stock overflow for product {product_id}: cannot add {quantity}")]
    StockOverflow { product_id: ProductId, quantity: u32 },

    /// Persisted counters violate `available + reserved <= total`.
    #[error(
        "Inconsistent counters for product {product_id}: total {total}, available {available}, reserved {reserved}"
    )]
    InconsistentCounters {
        product_id: ProductId,
        total: u32,
        available: u32,
        reserved: u32,
    },
}

impl LedgerError {
    /// Returns the unchanged counters attached to a guard failure, if any.
    pub fn levels(&self) -> Option<StockLevels> {
        match self {
            LedgerError::InsufficientStock { levels, .. }
            | LedgerError::InsufficientReserved { levels, .. } => Some(*levels),
            _ => None,
        }
    }
}

/// Errors raised by the order state machines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The `(from, to)` pair is not in the kind's transition graph.
    #[error("Invalid {kind} order transition: {from} -> {to}")]
    InvalidTransition {
        kind: OrderKind,
        from: String,
        to: String,
    },

    /// A persisted or requested status name is not part of the kind's enum.
    #[error("Unknown {kind} order status: {status}")]
    UnknownStatus { kind: OrderKind, status: String },
}

/// Errors raised while issuing or parsing order numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// All five-digit sequence numbers for the day have been issued.
    #[error("Order number sequence exhausted for {prefix} on {date}")]
    SequenceExhausted { prefix: String, date: String },

    /// The string is not of the form `<PREFIX>-<YYYYMMDD>-<NNNNN>`.
    #[error("Malformed order number: {0}")]
    Malformed(String),
}
