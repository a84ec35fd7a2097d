//! Shared handler state of both services.

use std::sync::Arc;

use inventory::InventoryLedger;
use saga::{ApplicationOrderService, FulfillmentOrderService, HistoryService};

/// State of the inventory service.
pub struct InventoryState<R, S> {
    pub ledger: Arc<InventoryLedger<R, S>>,
}

/// State of the order service.
pub struct OrderState<L, S> {
    pub applications: ApplicationOrderService<L, S>,
    pub fulfillments: FulfillmentOrderService<L, S>,
    pub history: HistoryService<S>,
}
