//! Inventory ledger service.
//!
//! Every counter mutation runs inside `ledger:lock:<productId>` so that
//! concurrent requests for one product are totally ordered.

pub mod error;
pub mod ledger;
pub mod operation;
pub mod protocol;

pub use error::{InventoryError, Result};
pub use ledger::{DEFAULT_LOCK_TTL, InventoryLedger, lock_key};
pub use operation::LedgerOperation;
pub use protocol::{LedgerRequest, LedgerResponse};
