//! Shared identifier types used across the inventory and order services.

mod types;

pub use types::{CenterId, FactoryId, OperatorId, OrderId, OrderKind, OutletId, ProductId};
