use thiserror::Error;

/// Errors that can occur while acquiring or releasing a lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The key is already held by another caller.
    #[error("Lock '{key}' is held by another caller")]
    AcquisitionFailed { key: String },

    /// The shared store could not be reached or rejected the command.
    #[error("Lock store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::StoreUnavailable(err.to_string())
    }
}

/// Result type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;
