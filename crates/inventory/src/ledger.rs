//! The inventory ledger service.

use std::time::Duration;

use chrono::Utc;
use common::{CenterId, ProductId};
use domain::{LedgerError, NewProduct, ProductLedger, StockLevels, StockStats};
use lock::{LockService, LockStore};
use store::ProductRepository;

use crate::{InventoryError, LedgerOperation, Result};

/// Lock TTL used when none is configured.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(5);

/// Lock key guarding one product's counters.
pub fn lock_key(product_id: ProductId) -> String {
    format!("ledger:lock:{product_id}")
}

/// Per-product stock counters, mutated only while holding the product lock.
pub struct InventoryLedger<R, S> {
    products: R,
    locks: LockService<S>,
    lock_ttl: Duration,
}

impl<R, S> InventoryLedger<R, S>
where
    R: ProductRepository,
    S: LockStore + Clone + 'static,
{
    pub fn new(products: R, lock_store: S, lock_ttl: Duration) -> Self {
        Self {
            products,
            locks: LockService::new(lock_store),
            lock_ttl,
        }
    }

    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    /// Moves stock from available to reserved for `order_ref`.
    #[tracing::instrument(skip(self), fields(operation = "reserve"))]
    pub async fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_ref: &str,
    ) -> Result<StockLevels> {
        self.mutate(LedgerOperation::Reserve, product_id, quantity, order_ref)
            .await
    }

    /// Returns reserved stock to the available pool.
    #[tracing::instrument(skip(self), fields(operation = "release"))]
    pub async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_ref: &str,
    ) -> Result<StockLevels> {
        self.mutate(LedgerOperation::Release, product_id, quantity, order_ref)
            .await
    }

    /// Turns a reservation into a sale.
    #[tracing::instrument(skip(self), fields(operation = "confirm"))]
    pub async fn confirm(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_ref: &str,
    ) -> Result<StockLevels> {
        self.mutate(LedgerOperation::Confirm, product_id, quantity, order_ref)
            .await
    }

    /// Adds freshly printed stock.
    #[tracing::instrument(skip(self), fields(operation = "restock"))]
    pub async fn restock(
        &self,
        product_id: ProductId,
        quantity: u32,
        order_ref: &str,
    ) -> Result<StockLevels> {
        self.mutate(LedgerOperation::Restock, product_id, quantity, order_ref)
            .await
    }

    /// Dispatches a mutation by name.
    pub async fn apply(
        &self,
        operation: LedgerOperation,
        product_id: ProductId,
        quantity: u32,
        order_ref: &str,
    ) -> Result<StockLevels> {
        match operation {
            LedgerOperation::Reserve => self.reserve(product_id, quantity, order_ref).await,
            LedgerOperation::Release => self.release(product_id, quantity, order_ref).await,
            LedgerOperation::Confirm => self.confirm(product_id, quantity, order_ref).await,
            LedgerOperation::Restock => self.restock(product_id, quantity, order_ref).await,
        }
    }

    /// Reads all four figures without taking the lock.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self, product_id: ProductId) -> Result<StockStats> {
        Ok(self.get_product(product_id).await?.stats())
    }

    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn register_product(&self, product: NewProduct) -> Result<ProductLedger> {
        if product.name.trim().is_empty() {
            return Err(InventoryError::Validation(
                "product name must not be empty".to_string(),
            ));
        }
        if product.unit_price_cents < 0 {
            return Err(InventoryError::Validation(format!(
                "unit price must not be negative: {}",
                product.unit_price_cents
            )));
        }

        let ledger = self.products.insert(product, Utc::now()).await?;
        tracing::info!(
            product_id = %ledger.id(),
            total_stock = ledger.total_stock(),
            "product registered"
        );
        metrics::counter!("products_registered_total").increment(1);
        Ok(ledger)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<ProductLedger> {
        self.products
            .get(product_id)
            .await?
            .ok_or(InventoryError::Ledger(LedgerError::ProductNotFound(
                product_id,
            )))
    }

    pub async fn list_products(&self) -> Result<Vec<ProductLedger>> {
        Ok(self.products.list().await?)
    }

    pub async fn list_products_by_center(&self, center_id: CenterId) -> Result<Vec<ProductLedger>> {
        Ok(self.products.list_by_center(center_id).await?)
    }

    async fn mutate(
        &self,
        operation: LedgerOperation,
        product_id: ProductId,
        quantity: u32,
        order_ref: &str,
    ) -> Result<StockLevels> {
        if quantity == 0 {
            let result = Err(InventoryError::Validation(
                "quantity must be greater than 0".to_string(),
            ));
            record(operation, &result);
            return result;
        }

        let products = &self.products;
        let result = self
            .locks
            .with_lock(&lock_key(product_id), self.lock_ttl, move || async move {
                let mut ledger = products
                    .get(product_id)
                    .await?
                    .ok_or(LedgerError::ProductNotFound(product_id))?;
                let levels = operation.apply(&mut ledger, quantity, Utc::now())?;
                products.save_counters(&ledger).await?;
                Ok::<_, InventoryError>(levels)
            })
            .await;

        record(operation, &result);
        match &result {
            Ok(levels) => tracing::info!(
                operation = operation.as_str(),
                %product_id,
                quantity,
                order_ref,
                available_stock = levels.available_stock,
                reserved_stock = levels.reserved_stock,
                "ledger operation applied"
            ),
            Err(e @ InventoryError::Lock(_)) | Err(e @ InventoryError::Store(_)) => tracing::error!(
                operation = operation.as_str(),
                %product_id,
                quantity,
                order_ref,
                error = %e,
                "ledger operation failed"
            ),
            Err(e) => tracing::warn!(
                operation = operation.as_str(),
                %product_id,
                quantity,
                order_ref,
                error = %e,
                "ledger operation refused"
            ),
        }
        result
    }
}

fn record(operation: LedgerOperation, result: &Result<StockLevels>) {
    let outcome = match result {
        Ok(_) => "applied",
        Err(e) => e.outcome(),
    };
    metrics::counter!(
        "ledger_operations_total",
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
