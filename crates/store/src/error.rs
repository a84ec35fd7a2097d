use common::OrderId;
use thiserror::Error;

/// Errors raised by repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A conditional status update found the order in another status.
    #[error("Order {order_id} is {actual}, expected {expected}")]
    StatusConflict {
        order_id: OrderId,
        expected: String,
        actual: String,
    },

    /// An order number was issued twice.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    /// A stored row cannot be turned back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The backing store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn corrupt(err: impl std::fmt::Display) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StoreError>;
