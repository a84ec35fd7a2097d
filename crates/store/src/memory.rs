//! In-memory repositories for tests and single-process runs.
//!
//! Both stores can be told to fail on purpose so callers can exercise their
//! failure paths.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CenterId, OrderId, OrderKind, ProductId};
use domain::{
    ApplicationOrder, ApplicationStatus, FulfillmentOrder, FulfillmentStatus, NewApplicationOrder,
    NewFulfillmentOrder, NewProduct, NewStatusHistoryEntry, OrderNumber, OrderStatus,
    ProductLedger, StatusHistoryEntry,
};
use tokio::sync::RwLock;

use crate::repository::{
    ApplicationFilter, ApplicationOrderRepository, FulfillmentFilter, FulfillmentOrderRepository,
    HistoryRepository, ProductRepository, StatusUpdate,
};
use crate::{Result, StoreError};

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    failing_inserts: AtomicUsize,
    failing_status_writes: AtomicUsize,
    failing_appends: AtomicUsize,
}

impl Faults {
    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".into()));
        }
        Ok(())
    }

    fn trip(counter: &AtomicUsize, what: &str) -> Result<()> {
        if counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable(format!("injected {what} failure")));
        }
        Ok(())
    }
}

/// In-memory product repository.
#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<BTreeMap<ProductId, ProductLedger>>>,
    faults: Arc<Faults>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fails the next `n` counter writes.
    pub fn fail_next_saves(&self, n: usize) {
        self.faults.failing_status_writes.store(n, Ordering::SeqCst);
    }

    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, product: NewProduct, at: DateTime<Utc>) -> Result<ProductLedger> {
        self.faults.check()?;
        let mut products = self.products.write().await;
        let next_id = products.keys().next_back().map_or(1, |id| id.as_i64() + 1);
        let ledger = ProductLedger::register(ProductId::new(next_id), product, at);
        products.insert(ledger.id(), ledger.clone());
        Ok(ledger)
    }

    async fn get(&self, id: ProductId) -> Result<Option<ProductLedger>> {
        self.faults.check()?;
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<ProductLedger>> {
        self.faults.check()?;
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn list_by_center(&self, center_id: CenterId) -> Result<Vec<ProductLedger>> {
        self.faults.check()?;
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.center_id() == center_id)
            .cloned()
            .collect())
    }

    async fn save_counters(&self, ledger: &ProductLedger) -> Result<()> {
        self.faults.check()?;
        Faults::trip(&self.faults.failing_status_writes, "save")?;
        let mut products = self.products.write().await;
        let slot = products.get_mut(&ledger.id()).ok_or(StoreError::NotFound {
            entity: "Product",
            id: ledger.id().as_i64(),
        })?;
        *slot = ledger.clone();
        Ok(())
    }
}

#[derive(Default)]
struct OrderTables {
    applications: BTreeMap<OrderId, ApplicationOrder>,
    fulfillments: BTreeMap<OrderId, FulfillmentOrder>,
    history: Vec<StatusHistoryEntry>,
}

/// In-memory application, fulfillment and history tables.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<OrderTables>>,
    faults: Arc<Faults>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fails the next `n` order inserts of either kind.
    pub fn fail_next_inserts(&self, n: usize) {
        self.faults.failing_inserts.store(n, Ordering::SeqCst);
    }

    /// Fails the next `n` status updates of either kind.
    pub fn fail_next_status_writes(&self, n: usize) {
        self.faults.failing_status_writes.store(n, Ordering::SeqCst);
    }

    /// Fails the next `n` history appends.
    pub fn fail_next_history_appends(&self, n: usize) {
        self.faults.failing_appends.store(n, Ordering::SeqCst);
    }

    pub async fn history_count(&self) -> usize {
        self.tables.read().await.history.len()
    }
}

fn next_order_id<V>(table: &BTreeMap<OrderId, V>) -> OrderId {
    OrderId::new(table.keys().next_back().map_or(1, |id| id.as_i64() + 1))
}

fn last_number<'a>(numbers: impl Iterator<Item = &'a OrderNumber>, stem: &str) -> Option<OrderNumber> {
    numbers
        .filter(|n| n.as_str().starts_with(stem))
        .max_by(|a, b| a.as_str().cmp(b.as_str()))
        .cloned()
}

fn check_expected<S: OrderStatus>(id: OrderId, expected: S, actual: S) -> Result<()> {
    if expected != actual {
        return Err(StoreError::StatusConflict {
            order_id: id,
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl ApplicationOrderRepository for InMemoryOrderStore {
    async fn insert_application(
        &self,
        number: OrderNumber,
        order: NewApplicationOrder,
        at: DateTime<Utc>,
    ) -> Result<ApplicationOrder> {
        self.faults.check()?;
        Faults::trip(&self.faults.failing_inserts, "insert")?;
        let mut tables = self.tables.write().await;
        if tables
            .applications
            .values()
            .any(|o| o.order_number == number)
        {
            return Err(StoreError::DuplicateOrderNumber(number.to_string()));
        }
        let id = next_order_id(&tables.applications);
        let order = ApplicationOrder::new(id, number, order, at);
        tables.applications.insert(id, order.clone());
        Ok(order)
    }

    async fn get_application(&self, id: OrderId) -> Result<Option<ApplicationOrder>> {
        self.faults.check()?;
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn get_application_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<ApplicationOrder>> {
        self.faults.check()?;
        Ok(self
            .tables
            .read()
            .await
            .applications
            .values()
            .find(|o| &o.order_number == number)
            .cloned())
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationOrder>> {
        self.faults.check()?;
        Ok(self
            .tables
            .read()
            .await
            .applications
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    async fn update_application_status(
        &self,
        id: OrderId,
        update: StatusUpdate<ApplicationStatus>,
    ) -> Result<ApplicationOrder> {
        self.faults.check()?;
        Faults::trip(&self.faults.failing_status_writes, "status write")?;
        let mut tables = self.tables.write().await;
        let order = tables
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "Application order",
                id: id.as_i64(),
            })?;
        check_expected(id, update.expected, order.status)?;
        order.status = update.next;
        if let Some(quantity) = update.quantity {
            order.quantity = quantity;
        }
        if update.remarks.is_some() {
            order.remarks = update.remarks;
        }
        order.updated_at = update.at;
        Ok(order.clone())
    }

    async fn last_application_number(&self, stem: &str) -> Result<Option<OrderNumber>> {
        self.faults.check()?;
        let tables = self.tables.read().await;
        Ok(last_number(
            tables.applications.values().map(|o| &o.order_number),
            stem,
        ))
    }
}

#[async_trait]
impl FulfillmentOrderRepository for InMemoryOrderStore {
    async fn insert_fulfillment(
        &self,
        number: OrderNumber,
        order: NewFulfillmentOrder,
        at: DateTime<Utc>,
    ) -> Result<FulfillmentOrder> {
        self.faults.check()?;
        Faults::trip(&self.faults.failing_inserts, "insert")?;
        let mut tables = self.tables.write().await;
        if tables
            .fulfillments
            .values()
            .any(|o| o.order_number == number)
        {
            return Err(StoreError::DuplicateOrderNumber(number.to_string()));
        }
        if let Some(app_id) = order.application_order_id
            && !tables.applications.contains_key(&app_id)
        {
            return Err(StoreError::NotFound {
                entity: "Application order",
                id: app_id.as_i64(),
            });
        }
        let id = next_order_id(&tables.fulfillments);
        let order = FulfillmentOrder::new(id, number, order, at);
        tables.fulfillments.insert(id, order.clone());
        Ok(order)
    }

    async fn get_fulfillment(&self, id: OrderId) -> Result<Option<FulfillmentOrder>> {
        self.faults.check()?;
        Ok(self.tables.read().await.fulfillments.get(&id).cloned())
    }

    async fn get_fulfillment_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<FulfillmentOrder>> {
        self.faults.check()?;
        Ok(self
            .tables
            .read()
            .await
            .fulfillments
            .values()
            .find(|o| &o.order_number == number)
            .cloned())
    }

    async fn list_fulfillments(&self, filter: &FulfillmentFilter) -> Result<Vec<FulfillmentOrder>> {
        self.faults.check()?;
        Ok(self
            .tables
            .read()
            .await
            .fulfillments
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    async fn list_fulfillments_for_application(
        &self,
        application_order_id: OrderId,
    ) -> Result<Vec<FulfillmentOrder>> {
        self.faults.check()?;
        Ok(self
            .tables
            .read()
            .await
            .fulfillments
            .values()
            .filter(|o| o.application_order_id == Some(application_order_id))
            .cloned()
            .collect())
    }

    async fn update_fulfillment_status(
        &self,
        id: OrderId,
        update: StatusUpdate<FulfillmentStatus>,
    ) -> Result<FulfillmentOrder> {
        self.faults.check()?;
        Faults::trip(&self.faults.failing_status_writes, "status write")?;
        let mut tables = self.tables.write().await;
        let order = tables
            .fulfillments
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "Fulfillment order",
                id: id.as_i64(),
            })?;
        check_expected(id, update.expected, order.status)?;
        order.status = update.next;
        if let Some(quantity) = update.quantity {
            order.quantity = quantity;
        }
        if update.remarks.is_some() {
            order.remarks = update.remarks;
        }
        order.updated_at = update.at;
        Ok(order.clone())
    }

    async fn last_fulfillment_number(&self, stem: &str) -> Result<Option<OrderNumber>> {
        self.faults.check()?;
        let tables = self.tables.read().await;
        Ok(last_number(
            tables.fulfillments.values().map(|o| &o.order_number),
            stem,
        ))
    }
}

#[async_trait]
impl HistoryRepository for InMemoryOrderStore {
    async fn append(&self, entry: NewStatusHistoryEntry) -> Result<StatusHistoryEntry> {
        self.faults.check()?;
        Faults::trip(&self.faults.failing_appends, "history append")?;
        let mut tables = self.tables.write().await;
        let id = tables.history.len() as i64 + 1;
        let entry = StatusHistoryEntry::from_new(id, entry);
        tables.history.push(entry.clone());
        Ok(entry)
    }

    async fn list_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>> {
        self.faults.check()?;
        Ok(self
            .tables
            .read()
            .await
            .history
            .iter()
            .filter(|e| e.order_kind == kind && e.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn latest_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Option<StatusHistoryEntry>> {
        self.faults.check()?;
        Ok(self
            .tables
            .read()
            .await
            .history
            .iter()
            .rev()
            .find(|e| e.order_kind == kind && e.order_id == order_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{FactoryId, OutletId};
    use domain::{SequenceGenerator, TransitionContext};

    fn new_application(quantity: u32) -> NewApplicationOrder {
        NewApplicationOrder {
            outlet_id: OutletId::new(1),
            center_id: CenterId::new(2),
            product_id: ProductId::new(3),
            quantity,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn test_products_get_sequential_ids() {
        let repo = InMemoryProductRepository::new();
        let product = NewProduct {
            name: "A".into(),
            description: None,
            center_id: CenterId::new(1),
            unit_price_cents: 100,
            initial_stock: 10,
        };
        let first = repo.insert(product.clone(), Utc::now()).await.unwrap();
        let second = repo
            .insert(
                NewProduct {
                    center_id: CenterId::new(2),
                    ..product
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(first.id(), ProductId::new(1));
        assert_eq!(second.id(), ProductId::new(2));
        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert_eq!(repo.list_by_center(CenterId::new(2)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_counters_for_missing_product() {
        let repo = InMemoryProductRepository::new();
        let ghost = ProductLedger::register(
            ProductId::new(99),
            NewProduct {
                name: "ghost".into(),
                description: None,
                center_id: CenterId::new(1),
                unit_price_cents: 1,
                initial_stock: 1,
            },
            Utc::now(),
        );
        let err = repo.save_counters(&ghost).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 99, .. }));
    }

    #[tokio::test]
    async fn test_conditional_status_update() {
        let store = InMemoryOrderStore::new();
        let numbers = SequenceGenerator::default();
        let order = store
            .insert_application(numbers.next("APP").unwrap(), new_application(5), Utc::now())
            .await
            .unwrap();

        let updated = store
            .update_application_status(
                order.id,
                StatusUpdate::new(
                    ApplicationStatus::Pending,
                    ApplicationStatus::Approved,
                    Utc::now(),
                )
                .with_quantity(3),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Approved);
        assert_eq!(updated.quantity, 3);

        let err = store
            .update_application_status(
                order.id,
                StatusUpdate::new(
                    ApplicationStatus::Pending,
                    ApplicationStatus::Rejected,
                    Utc::now(),
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));
    }

    #[tokio::test]
    async fn test_injected_status_write_failures_are_consumed() {
        let store = InMemoryOrderStore::new();
        let numbers = SequenceGenerator::default();
        let order = store
            .insert_application(numbers.next("APP").unwrap(), new_application(5), Utc::now())
            .await
            .unwrap();
        store.fail_next_status_writes(1);

        let update = StatusUpdate::new(
            ApplicationStatus::Pending,
            ApplicationStatus::Rejected,
            Utc::now(),
        );
        assert!(matches!(
            store
                .update_application_status(order.id, update.clone())
                .await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.update_application_status(order.id, update).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let store = InMemoryOrderStore::new();
        let number: OrderNumber = "APP-20260101-00001".parse().unwrap();
        store
            .insert_application(number.clone(), new_application(1), Utc::now())
            .await
            .unwrap();
        let err = store
            .insert_application(number, new_application(1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrderNumber(_)));
    }

    #[tokio::test]
    async fn test_last_number_uses_stem() {
        let store = InMemoryOrderStore::new();
        for raw in ["FUL-20260101-00009", "FUL-20260102-00002", "FUL-20260102-00011"] {
            store
                .insert_fulfillment(
                    raw.parse().unwrap(),
                    NewFulfillmentOrder {
                        application_order_id: None,
                        factory_id: FactoryId::new(1),
                        product_id: ProductId::new(1),
                        quantity: 1,
                        remarks: None,
                    },
                    Utc::now(),
                )
                .await
                .unwrap();
        }
        let last = store
            .last_fulfillment_number("FUL-20260102-")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.sequence(), 11);
        assert!(
            store
                .last_fulfillment_number("FUL-20260103-")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_history_is_ordered_per_order() {
        let store = InMemoryOrderStore::new();
        let entry = |order_id: i64, from: &str, to: &str| NewStatusHistoryEntry {
            order_kind: OrderKind::Application,
            order_id: OrderId::new(order_id),
            from_status: from.into(),
            to_status: to.into(),
            context: TransitionContext::default(),
            created_at: Utc::now(),
        };
        store.append(entry(1, "Pending", "Approved")).await.unwrap();
        store.append(entry(2, "Pending", "Rejected")).await.unwrap();
        store
            .append(entry(1, "Approved", "WaitingShipment"))
            .await
            .unwrap();

        let history = store
            .list_for_order(OrderKind::Application, OrderId::new(1))
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].id < history[1].id);

        let latest = store
            .latest_for_order(OrderKind::Application, OrderId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.to_status, "WaitingShipment");
        assert!(
            store
                .latest_for_order(OrderKind::Fulfillment, OrderId::new(1))
                .await
                .unwrap()
                .is_none()
        );
    }
}
