//! PostgreSQL repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CenterId, FactoryId, OperatorId, OrderId, OrderKind, OutletId, ProductId};
use domain::{
    ApplicationOrder, ApplicationStatus, FulfillmentOrder, FulfillmentStatus, NewApplicationOrder,
    NewFulfillmentOrder, NewProduct, NewStatusHistoryEntry, OrderNumber, OrderStatus,
    ProductLedger, StatusHistoryEntry,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::repository::{
    ApplicationFilter, ApplicationOrderRepository, FulfillmentFilter, FulfillmentOrderRepository,
    HistoryRepository, ProductRepository, StatusUpdate,
};
use crate::{Result, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, description, center_id, unit_price_cents, is_active, \
     total_stock, available_stock, reserved_stock, created_at, updated_at";

const APPLICATION_COLUMNS: &str = "id, order_number, outlet_id, center_id, product_id, quantity, \
     status, remarks, created_at, updated_at";

const FULFILLMENT_COLUMNS: &str = "id, order_number, application_order_id, factory_id, product_id, \
     quantity, status, remarks, created_at, updated_at";

const HISTORY_COLUMNS: &str = "id, order_kind, order_id, from_status, to_status, operator_id, \
     operator_name, reason, created_at";

fn count(row: &PgRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn order_number(row: &PgRow) -> Result<OrderNumber> {
    let raw: String = row.try_get("order_number")?;
    raw.parse().map_err(StoreError::corrupt)
}

fn is_constraint(err: &sqlx::Error, name: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(name))
}

/// Product ledger rows in the inventory database.
#[derive(Clone)]
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the inventory database migrations.
    ///
    /// Versions owned by the order store are ignored so both services can
    /// share one database.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        let mut migrator = sqlx::migrate!("../../migrations/inventory");
        migrator.set_ignore_missing(true).run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<ProductLedger> {
        ProductLedger::from_parts(
            ProductId::new(row.try_get("id")?),
            row.try_get("name")?,
            row.try_get("description")?,
            CenterId::new(row.try_get("center_id")?),
            row.try_get("unit_price_cents")?,
            row.try_get("is_active")?,
            count(&row, "total_stock")?,
            count(&row, "available_stock")?,
            count(&row, "reserved_stock")?,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        )
        .map_err(StoreError::corrupt)
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn insert(&self, product: NewProduct, at: DateTime<Utc>) -> Result<ProductLedger> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, description, center_id, unit_price_cents, is_active,
                                  total_stock, available_stock, reserved_stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $5, 0, $6, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.center_id.as_i64())
        .bind(product.unit_price_cents)
        .bind(i64::from(product.initial_stock))
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn get(&self, id: ProductId) -> Result<Option<ProductLedger>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list(&self) -> Result<Vec<ProductLedger>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn list_by_center(&self, center_id: CenterId) -> Result<Vec<ProductLedger>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE center_id = $1 ORDER BY id ASC"
        ))
        .bind(center_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn save_counters(&self, ledger: &ProductLedger) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET total_stock = $2, available_stock = $3, reserved_stock = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(ledger.id().as_i64())
        .bind(i64::from(ledger.total_stock()))
        .bind(i64::from(ledger.available_stock()))
        .bind(i64::from(ledger.reserved_stock()))
        .bind(ledger.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Product",
                id: ledger.id().as_i64(),
            });
        }
        Ok(())
    }
}

/// Application orders, fulfillment orders and status history in the order
/// database.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the order database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        let mut migrator = sqlx::migrate!("../../migrations/orders");
        migrator.set_ignore_missing(true).run(&self.pool).await
    }

    fn row_to_application(row: PgRow) -> Result<ApplicationOrder> {
        let status: String = row.try_get("status")?;
        Ok(ApplicationOrder {
            id: OrderId::new(row.try_get("id")?),
            order_number: order_number(&row)?,
            outlet_id: OutletId::new(row.try_get("outlet_id")?),
            center_id: CenterId::new(row.try_get("center_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: count(&row, "quantity")?,
            status: status.parse().map_err(StoreError::corrupt)?,
            remarks: row.try_get("remarks")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_fulfillment(row: PgRow) -> Result<FulfillmentOrder> {
        let status: String = row.try_get("status")?;
        let application_order_id: Option<i64> = row.try_get("application_order_id")?;
        Ok(FulfillmentOrder {
            id: OrderId::new(row.try_get("id")?),
            order_number: order_number(&row)?,
            application_order_id: application_order_id.map(OrderId::new),
            factory_id: FactoryId::new(row.try_get("factory_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: count(&row, "quantity")?,
            status: status.parse().map_err(StoreError::corrupt)?,
            remarks: row.try_get("remarks")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_history(row: PgRow) -> Result<StatusHistoryEntry> {
        let kind: String = row.try_get("order_kind")?;
        let operator_id: Option<i64> = row.try_get("operator_id")?;
        Ok(StatusHistoryEntry {
            id: row.try_get("id")?,
            order_kind: kind.parse::<OrderKind>().map_err(StoreError::Corrupt)?,
            order_id: OrderId::new(row.try_get("order_id")?),
            from_status: row.try_get("from_status")?,
            to_status: row.try_get("to_status")?,
            operator_id: operator_id.map(OperatorId::new),
            operator_name: row.try_get("operator_name")?,
            reason: row.try_get("reason")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Distinguishes a missing order from one that moved to another status
    /// after a conditional update matched no row.
    async fn explain_missed_update(
        &self,
        table: &str,
        entity: &'static str,
        id: OrderId,
        expected: &str,
    ) -> StoreError {
        let status: std::result::Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar(&format!("SELECT status FROM {table} WHERE id = $1"))
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await;
        match status {
            Ok(Some(actual)) => StoreError::StatusConflict {
                order_id: id,
                expected: expected.to_string(),
                actual,
            },
            Ok(None) => StoreError::NotFound {
                entity,
                id: id.as_i64(),
            },
            Err(e) => StoreError::Database(e),
        }
    }

    async fn last_number(&self, table: &str, stem: &str) -> Result<Option<OrderNumber>> {
        let raw: Option<String> = sqlx::query_scalar(&format!(
            "SELECT order_number FROM {table} WHERE order_number LIKE $1 ORDER BY order_number DESC LIMIT 1"
        ))
        .bind(format!("{stem}%"))
        .fetch_optional(&self.pool)
        .await?;

        raw.map(|n| n.parse().map_err(StoreError::corrupt))
            .transpose()
    }
}

#[async_trait]
impl ApplicationOrderRepository for PostgresOrderStore {
    async fn insert_application(
        &self,
        number: OrderNumber,
        order: NewApplicationOrder,
        at: DateTime<Utc>,
    ) -> Result<ApplicationOrder> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO application_orders (order_number, outlet_id, center_id, product_id, quantity,
                                            status, remarks, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(number.as_str())
        .bind(order.outlet_id.as_i64())
        .bind(order.center_id.as_i64())
        .bind(order.product_id.as_i64())
        .bind(i64::from(order.quantity))
        .bind(ApplicationStatus::Pending.to_string())
        .bind(&order.remarks)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_constraint(&e, "application_orders_order_number_key") {
                return StoreError::DuplicateOrderNumber(number.to_string());
            }
            StoreError::Database(e)
        })?;

        Self::row_to_application(row)
    }

    async fn get_application(&self, id: OrderId) -> Result<Option<ApplicationOrder>> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM application_orders WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_application).transpose()
    }

    async fn get_application_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<ApplicationOrder>> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM application_orders WHERE order_number = $1"
        ))
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_application).transpose()
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationOrder>> {
        let mut sql = format!("SELECT {APPLICATION_COLUMNS} FROM application_orders WHERE 1=1");
        let mut param_count = 0;

        if filter.outlet_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND outlet_id = ${param_count}"));
        }
        if filter.center_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND center_id = ${param_count}"));
        }
        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(outlet_id) = filter.outlet_id {
            query = query.bind(outlet_id.as_i64());
        }
        if let Some(center_id) = filter.center_id {
            query = query.bind(center_id.as_i64());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_application).collect()
    }

    async fn update_application_status(
        &self,
        id: OrderId,
        update: StatusUpdate<ApplicationStatus>,
    ) -> Result<ApplicationOrder> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE application_orders
            SET status = $3,
                quantity = COALESCE($4, quantity),
                remarks = COALESCE($5, remarks),
                updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(update.expected.to_string())
        .bind(update.next.to_string())
        .bind(update.quantity.map(i64::from))
        .bind(&update.remarks)
        .bind(update.at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_application(row),
            None => Err(self
                .explain_missed_update(
                    "application_orders",
                    "Application order",
                    id,
                    update.expected.as_str(),
                )
                .await),
        }
    }

    async fn last_application_number(&self, stem: &str) -> Result<Option<OrderNumber>> {
        self.last_number("application_orders", stem).await
    }
}

#[async_trait]
impl FulfillmentOrderRepository for PostgresOrderStore {
    async fn insert_fulfillment(
        &self,
        number: OrderNumber,
        order: NewFulfillmentOrder,
        at: DateTime<Utc>,
    ) -> Result<FulfillmentOrder> {
        let application_order_id = order.application_order_id;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO fulfillment_orders (order_number, application_order_id, factory_id, product_id,
                                            quantity, status, remarks, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {FULFILLMENT_COLUMNS}
            "#
        ))
        .bind(number.as_str())
        .bind(application_order_id.map(|id| id.as_i64()))
        .bind(order.factory_id.as_i64())
        .bind(order.product_id.as_i64())
        .bind(i64::from(order.quantity))
        .bind(FulfillmentStatus::Pending.to_string())
        .bind(&order.remarks)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_constraint(&e, "fulfillment_orders_order_number_key") {
                return StoreError::DuplicateOrderNumber(number.to_string());
            }
            if is_constraint(&e, "fulfillment_orders_application_order_id_fkey") {
                return StoreError::NotFound {
                    entity: "Application order",
                    id: application_order_id.map_or(0, |id| id.as_i64()),
                };
            }
            StoreError::Database(e)
        })?;

        Self::row_to_fulfillment(row)
    }

    async fn get_fulfillment(&self, id: OrderId) -> Result<Option<FulfillmentOrder>> {
        let row = sqlx::query(&format!(
            "SELECT {FULFILLMENT_COLUMNS} FROM fulfillment_orders WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_fulfillment).transpose()
    }

    async fn get_fulfillment_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<FulfillmentOrder>> {
        let row = sqlx::query(&format!(
            "SELECT {FULFILLMENT_COLUMNS} FROM fulfillment_orders WHERE order_number = $1"
        ))
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_fulfillment).transpose()
    }

    async fn list_fulfillments(&self, filter: &FulfillmentFilter) -> Result<Vec<FulfillmentOrder>> {
        let mut sql = format!("SELECT {FULFILLMENT_COLUMNS} FROM fulfillment_orders WHERE 1=1");
        let mut param_count = 0;

        if filter.factory_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND factory_id = ${param_count}"));
        }
        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(factory_id) = filter.factory_id {
            query = query.bind(factory_id.as_i64());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.to_string());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_fulfillment).collect()
    }

    async fn list_fulfillments_for_application(
        &self,
        application_order_id: OrderId,
    ) -> Result<Vec<FulfillmentOrder>> {
        let rows = sqlx::query(&format!(
            "SELECT {FULFILLMENT_COLUMNS} FROM fulfillment_orders WHERE application_order_id = $1 ORDER BY id ASC"
        ))
        .bind(application_order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_fulfillment).collect()
    }

    async fn update_fulfillment_status(
        &self,
        id: OrderId,
        update: StatusUpdate<FulfillmentStatus>,
    ) -> Result<FulfillmentOrder> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE fulfillment_orders
            SET status = $3,
                quantity = COALESCE($4, quantity),
                remarks = COALESCE($5, remarks),
                updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {FULFILLMENT_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(update.expected.to_string())
        .bind(update.next.to_string())
        .bind(update.quantity.map(i64::from))
        .bind(&update.remarks)
        .bind(update.at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_fulfillment(row),
            None => Err(self
                .explain_missed_update(
                    "fulfillment_orders",
                    "Fulfillment order",
                    id,
                    update.expected.as_str(),
                )
                .await),
        }
    }

    async fn last_fulfillment_number(&self, stem: &str) -> Result<Option<OrderNumber>> {
        self.last_number("fulfillment_orders", stem).await
    }
}

#[async_trait]
impl HistoryRepository for PostgresOrderStore {
    async fn append(&self, entry: NewStatusHistoryEntry) -> Result<StatusHistoryEntry> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO order_status_history (order_kind, order_id, from_status, to_status,
                                              operator_id, operator_name, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {HISTORY_COLUMNS}
            "#
        ))
        .bind(entry.order_kind.as_str())
        .bind(entry.order_id.as_i64())
        .bind(&entry.from_status)
        .bind(&entry.to_status)
        .bind(entry.context.operator_id.map(|id| id.as_i64()))
        .bind(&entry.context.operator_name)
        .bind(&entry.context.reason)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_history(row)
    }

    async fn list_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM order_status_history
            WHERE order_kind = $1 AND order_id = $2
            ORDER BY id ASC
            "#
        ))
        .bind(kind.as_str())
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_history).collect()
    }

    async fn latest_for_order(
        &self,
        kind: OrderKind,
        order_id: OrderId,
    ) -> Result<Option<StatusHistoryEntry>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM order_status_history
            WHERE order_kind = $1 AND order_id = $2
            ORDER BY id DESC
            LIMIT 1
            "#
        ))
        .bind(kind.as_str())
        .bind(order_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_history).transpose()
    }
}
