//! Order lifecycle orchestration over the stock ledger.
//!
//! Application and fulfillment orders move through fixed status graphs.
//! Steps that touch stock call the ledger through a [`LedgerClient`] before
//! the status write they guard:
//!
//! 1. Create an application order: reserve, then insert as Pending
//! 2. Approve: confirm, approve, release any remainder, raise a fulfillment order
//! 3. Reject: release, then reject
//! 4. Complete an unlinked fulfillment order: restock, then complete
//!
//! Steps 2 to 4 hold the order's lock (see [`OrderLocks`]) from the status
//! check through the status write, so the stock step runs once per order.
//! A refused or failed ledger call aborts the step with nothing written.
//! A failed write after a successful ledger call is retried and then
//! reported as [`SagaError::StatusWriteFailed`]; it is never compensated.

pub mod application;
pub mod error;
pub mod fulfillment;
pub mod history;
pub mod locking;
pub mod numbering;
pub mod retry;
pub mod services;
pub mod steps;

pub use application::{ApplicationOrderService, Approval, ApproveApplication};
pub use error::{Result, SagaError};
pub use fulfillment::FulfillmentOrderService;
pub use history::HistoryService;
pub use locking::{DEFAULT_ORDER_LOCK_TTL, OrderLocks, order_lock_key};
pub use numbering::seed_order_numbers;
pub use retry::StatusWritePolicy;
pub use services::{
    HttpLedgerClient, LedgerClient, LedgerOutcome, LedgerRefusal, LocalLedgerClient, RefusalKind,
};
