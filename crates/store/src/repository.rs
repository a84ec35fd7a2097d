//! Repository capabilities.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CenterId, FactoryId, OrderId, OrderKind, OutletId, ProductId};
use domain::{
    ApplicationOrder, ApplicationStatus, FulfillmentOrder, FulfillmentStatus, NewApplicationOrder,
    NewFulfillmentOrder, NewProduct, NewStatusHistoryEntry, OrderNumber, ProductLedger,
    StatusHistoryEntry,
};
use serde::Deserialize;

use crate::Result;

/// Product rows and their stock counters.
///
/// Counter writes are not guarded here; callers serialize them per product.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: NewProduct, at: DateTime<Utc>) -> Result<ProductLedger>;

    async fn get(&self, id: ProductId) -> Result<Option<ProductLedger>>;

    async fn list(&self) -> Result<Vec<ProductLedger>>;

    async fn list_by_center(&self, center_id: CenterId) -> Result<Vec<ProductLedger>>;

    /// Persists the counters and `updated_at` of an existing product.
    async fn save_counters(&self, ledger: &ProductLedger) -> Result<()>;
}

/// A conditional status change: applied only while the order is still in
/// `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate<S> {
    pub expected: S,
    pub next: S,
    /// Replaces the order quantity when set.
    pub quantity: Option<u32>,
    /// Replaces the order remarks when set.
    pub remarks: Option<String>,
    pub at: DateTime<Utc>,
}

impl<S> StatusUpdate<S> {
    pub fn new(expected: S, next: S, at: DateTime<Utc>) -> Self {
        Self {
            expected,
            next,
            quantity: None,
            remarks: None,
            at,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_remarks(mut self, remarks: Option<String>) -> Self {
        self.remarks = remarks;
        self
    }
}

/// Filters for listing application orders. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    pub outlet_id: Option<OutletId>,
    pub center_id: Option<CenterId>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn matches(&self, order: &ApplicationOrder) -> bool {
        self.outlet_id.is_none_or(|id| order.outlet_id == id)
            && self.center_id.is_none_or(|id| order.center_id == id)
            && self.status.is_none_or(|status| order.status == status)
    }
}

/// Filters for listing fulfillment orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentFilter {
    pub factory_id: Option<FactoryId>,
    pub status: Option<FulfillmentStatus>,
}

impl FulfillmentFilter {
    pub fn matches(&self, order: &FulfillmentOrder) -> bool {
        self.factory_id.is_none_or(|id| order.factory_id == id)
            && self.status.is_none_or(|status| order.status == status)
    }
}

#[async_trait]
pub trait ApplicationOrderRepository: Send + Sync {
    async fn insert_application(
        &self,
        number: OrderNumber,
        order: NewApplicationOrder,
        at: DateTime<Utc>,
    ) -> Result<ApplicationOrder>;

    async fn get_application(&self, id: OrderId) -> Result<Option<ApplicationOrder>>;

    async fn get_application_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<ApplicationOrder>>;

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationOrder>>;

    /// Applies `update` if the order is still in `update.expected`.
    ///
    /// Fails with `StatusConflict` when another writer moved it first.
    async fn update_application_status(
        &self,
        id: OrderId,
        update: StatusUpdate<ApplicationStatus>,
    ) -> Result<ApplicationOrder>;

    /// Highest application order number starting with `stem`.
    async fn last_application_number(&self, stem: &str) -> Result<Option<OrderNumber>>;
}

#[async_trait]
pub trait FulfillmentOrderRepository: Send + Sync {
    async fn insert_fulfillment(
        &self,
        number: OrderNumber,
        order: NewFulfillmentOrder,
        at: DateTime<Utc>,
    ) -> Result<FulfillmentOrder>;

    async fn get_fulfillment(&self, id: OrderId) -> Result<Option<FulfillmentOrder>>;

    async fn get_fulfillment_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<FulfillmentOrder>>;

    async fn list_fulfillments(&self, filter: &FulfillmentFilter) -> Result<Vec<FulfillmentOrder>>;

    async fn list_fulfillments_for_application(
        &self,
        application_order_id: OrderId,
    ) -> Result<Vec<FulfillmentOrder>>;

    async fn update_fulfillment_status(
        &self,
        id: OrderId,
        update: StatusUpdate<FulfillmentStatus>,
    ) -> Result<FulfillmentOrder>;

    async fn last_fulfillment_number(&self, stem: &str) -> Result<Option<OrderNumber>>;
}

/// Append-only status history log.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(&self, entry: NewStatusHistoryEntry) -> Result<StatusHistoryEntry>;

    /// Entries for one order, oldest first.
    async fn list_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>>;

    async fn latest_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Option<StatusHistoryEntry>>;
}

/// Everything the order service persists: both order kinds and their
/// history.
pub trait OrderStore:
    ApplicationOrderRepository + FulfillmentOrderRepository + HistoryRepository
{
}

impl<T> OrderStore for T where
    T: ApplicationOrderRepository + FulfillmentOrderRepository + HistoryRepository + ?Sized
{
}

#[async_trait]
impl<T: ProductRepository + ?Sized> ProductRepository for Arc<T> {
    async fn insert(&self, product: NewProduct, at: DateTime<Utc>) -> Result<ProductLedger> {
        (**self).insert(product, at).await
    }

    async fn get(&self, id: ProductId) -> Result<Option<ProductLedger>> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<ProductLedger>> {
        (**self).list().await
    }

    async fn list_by_center(&self, center_id: CenterId) -> Result<Vec<ProductLedger>> {
        (**self).list_by_center(center_id).await
    }

    async fn save_counters(&self, ledger: &ProductLedger) -> Result<()> {
        (**self).save_counters(ledger).await
    }
}

#[async_trait]
impl<T: ApplicationOrderRepository + ?Sized> ApplicationOrderRepository for Arc<T> {
    async fn insert_application(
        &self,
        number: OrderNumber,
        order: NewApplicationOrder,
        at: DateTime<Utc>,
    ) -> Result<ApplicationOrder> {
        (**self).insert_application(number, order, at).await
    }

    async fn get_application(&self, id: OrderId) -> Result<Option<ApplicationOrder>> {
        (**self).get_application(id).await
    }

    async fn get_application_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<ApplicationOrder>> {
        (**self).get_application_by_number(number).await
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationOrder>> {
        (**self).list_applications(filter).await
    }

    async fn update_application_status(
        &self,
        id: OrderId,
        update: StatusUpdate<ApplicationStatus>,
    ) -> Result<ApplicationOrder> {
        (**self).update_application_status(id, update).await
    }

    async fn last_application_number(&self, stem: &str) -> Result<Option<OrderNumber>> {
        (**self).last_application_number(stem).await
    }
}

#[async_trait]
impl<T: FulfillmentOrderRepository + ?Sized> FulfillmentOrderRepository for Arc<T> {
    async fn insert_fulfillment(
        &self,
        number: OrderNumber,
        order: NewFulfillmentOrder,
        at: DateTime<Utc>,
    ) -> Result<FulfillmentOrder> {
        (**self).insert_fulfillment(number, order, at).await
    }

    async fn get_fulfillment(&self, id: OrderId) -> Result<Option<FulfillmentOrder>> {
        (**self).get_fulfillment(id).await
    }

    async fn get_fulfillment_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<FulfillmentOrder>> {
        (**self).get_fulfillment_by_number(number).await
    }

    async fn list_fulfillments(&self, filter: &FulfillmentFilter) -> Result<Vec<FulfillmentOrder>> {
        (**self).list_fulfillments(filter).await
    }

    async fn list_fulfillments_for_application(
        &self,
        application_order_id: OrderId,
    ) -> Result<Vec<FulfillmentOrder>> {
        (**self)
            .list_fulfillments_for_application(application_order_id)
            .await
    }

    async fn update_fulfillment_status(
        &self,
        id: OrderId,
        update: StatusUpdate<FulfillmentStatus>,
    ) -> Result<FulfillmentOrder> {
        (**self).update_fulfillment_status(id, update).await
    }

    async fn last_fulfillment_number(&self, stem: &str) -> Result<Option<OrderNumber>> {
        (**self).last_fulfillment_number(stem).await
    }
}

#[async_trait]
impl<T: HistoryRepository + ?Sized> HistoryRepository for Arc<T> {
    async fn append(&self, entry: NewStatusHistoryEntry) -> Result<StatusHistoryEntry> {
        (**self).append(entry).await
    }

    async fn list_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>> {
        (**self).list_for_order(kind, order_id).await
    }

    async fn latest_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Option<StatusHistoryEntry>> {
        (**self).latest_for_order(kind, order_id).await
    }
}
