//! Domain layer for lottery stock distribution.
//!
//! This crate holds the pure model shared by the inventory and order services:
//! - [`ProductLedger`] with the reserve / release / confirm / restock guards
//! - the application and fulfillment order status graphs
//! - order models and the daily [`SequenceGenerator`] for order numbers
//! - status history entry types
//!
//! Nothing here performs I/O; persistence and locking live in other crates.

pub mod error;
pub mod history;
pub mod ledger;
pub mod order;

pub use error::{LedgerError, SequenceError, TransitionError};
pub use history::{NewStatusHistoryEntry, StatusHistoryEntry, TransitionContext};
pub use ledger::{NewProduct, ProductLedger, StockLevels, StockStats};
pub use order::{
    ApplicationOrder, ApplicationStatus, Clock, FulfillmentOrder, FulfillmentStatus, ManualClock,
    NewApplicationOrder, NewFulfillmentOrder, OrderNumber, OrderStatus, SequenceGenerator,
    SystemClock, prefix_for,
};
