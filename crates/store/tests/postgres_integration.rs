//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CenterId, FactoryId, OrderId, OrderKind, OutletId, ProductId};
use domain::{
    ApplicationStatus, FulfillmentStatus, NewApplicationOrder, NewFulfillmentOrder, NewProduct,
    NewStatusHistoryEntry, OrderNumber, TransitionContext,
};
use sqlx::PgPool;
use store::{
    ApplicationFilter, ApplicationOrderRepository, FulfillmentFilter, FulfillmentOrderRepository,
    HistoryRepository, PostgresOrderStore, PostgresProductRepository, ProductRepository,
    StatusUpdate, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/inventory/001_create_products.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/orders/002_create_orders.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh pool with cleared tables
async fn get_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE products, order_status_history, fulfillment_orders, application_orders RESTART IDENTITY",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

fn new_product(center: i64, initial_stock: u32) -> NewProduct {
    NewProduct {
        name: "Golden Ticket".to_string(),
        description: Some("Scratch card".to_string()),
        center_id: CenterId::new(center),
        unit_price_cents: 1000,
        initial_stock,
    }
}

fn new_application(outlet: i64, quantity: u32) -> NewApplicationOrder {
    NewApplicationOrder {
        outlet_id: OutletId::new(outlet),
        center_id: CenterId::new(1),
        product_id: ProductId::new(1),
        quantity,
        remarks: Some("weekly".to_string()),
    }
}

fn number(raw: &str) -> OrderNumber {
    raw.parse().unwrap()
}

mod products {
    use super::*;

    #[tokio::test]
    async fn insert_and_load_product() {
        let repo = PostgresProductRepository::new(get_pool().await);

        let product = repo.insert(new_product(1, 100), Utc::now()).await.unwrap();
        let loaded = repo.get(product.id()).await.unwrap().unwrap();

        assert_eq!(loaded.total_stock(), 100);
        assert_eq!(loaded.available_stock(), 100);
        assert_eq!(loaded.reserved_stock(), 0);
        assert_eq!(loaded.description(), Some("Scratch card"));
    }

    #[tokio::test]
    async fn save_counters_round_trips() {
        let repo = PostgresProductRepository::new(get_pool().await);
        let mut product = repo.insert(new_product(1, 100), Utc::now()).await.unwrap();

        product.reserve(30, Utc::now()).unwrap();
        product.confirm(30, Utc::now()).unwrap();
        repo.save_counters(&product).await.unwrap();

        let stats = repo.get(product.id()).await.unwrap().unwrap().stats();
        assert_eq!(stats.available_stock, 70);
        assert_eq!(stats.reserved_stock, 0);
        assert_eq!(stats.sold_stock, 30);
    }

    #[tokio::test]
    async fn list_by_center_filters() {
        let repo = PostgresProductRepository::new(get_pool().await);
        repo.insert(new_product(1, 1), Utc::now()).await.unwrap();
        repo.insert(new_product(2, 1), Utc::now()).await.unwrap();
        repo.insert(new_product(2, 1), Utc::now()).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 3);
        assert_eq!(repo.list_by_center(CenterId::new(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn balance_constraint_rejects_bad_counters() {
        let pool = get_pool().await;
        let repo = PostgresProductRepository::new(pool.clone());
        let product = repo.insert(new_product(1, 10), Utc::now()).await.unwrap();

        let result = sqlx::query("UPDATE products SET reserved_stock = 11 WHERE id = $1")
            .bind(product.id().as_i64())
            .execute(&pool)
            .await;

        assert!(result.is_err());
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn application_round_trip_and_lookup() {
        let store = PostgresOrderStore::new(get_pool().await);
        let created = store
            .insert_application(number("APP-20260101-00001"), new_application(5, 10), Utc::now())
            .await
            .unwrap();

        assert_eq!(created.status, ApplicationStatus::Pending);
        let by_id = store.get_application(created.id).await.unwrap().unwrap();
        let by_number = store
            .get_application_by_number(&created.order_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.id, by_number.id);
        assert_eq!(by_id.remarks.as_deref(), Some("weekly"));
    }

    #[tokio::test]
    async fn duplicate_number_is_reported() {
        let store = PostgresOrderStore::new(get_pool().await);
        store
            .insert_application(number("APP-20260101-00001"), new_application(5, 10), Utc::now())
            .await
            .unwrap();

        let err = store
            .insert_application(number("APP-20260101-00001"), new_application(6, 1), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateOrderNumber(_)));
    }

    #[tokio::test]
    async fn conditional_update_detects_conflict() {
        let store = PostgresOrderStore::new(get_pool().await);
        let order = store
            .insert_application(number("APP-20260101-00001"), new_application(5, 10), Utc::now())
            .await
            .unwrap();

        let approved = store
            .update_application_status(
                order.id,
                StatusUpdate::new(
                    ApplicationStatus::Pending,
                    ApplicationStatus::Approved,
                    Utc::now(),
                )
                .with_quantity(8)
                .with_remarks(Some("partial".to_string())),
            )
            .await
            .unwrap();
        assert_eq!(approved.status, ApplicationStatus::Approved);
        assert_eq!(approved.quantity, 8);
        assert_eq!(approved.remarks.as_deref(), Some("partial"));

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
        match err {
            StoreError::StatusConflict { actual, .. } => assert_eq!(actual, "Approved"),
            other => panic!("unexpected error: {other}"),
        }

        let err = store
            .update_application_status(
                OrderId::new(9999),
                StatusUpdate::new(
                    ApplicationStatus::Pending,
                    ApplicationStatus::Rejected,
                    Utc::now(),
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 9999, .. }));
    }

    #[tokio::test]
    async fn application_filters_combine() {
        let store = PostgresOrderStore::new(get_pool().await);
        for (i, outlet) in [1, 1, 2].into_iter().enumerate() {
            store
                .insert_application(
                    number(&format!("APP-20260101-{:05}", i + 1)),
                    new_application(outlet, 3),
                    Utc::now(),
                )
                .await
                .unwrap();
        }

        let outlet_one = store
            .list_applications(&ApplicationFilter {
                outlet_id: Some(OutletId::new(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outlet_one.len(), 2);

        let approved = store
            .list_applications(&ApplicationFilter {
                status: Some(ApplicationStatus::Approved),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(approved.is_empty());
    }

    #[tokio::test]
    async fn last_number_reads_highest_for_stem() {
        let store = PostgresOrderStore::new(get_pool().await);
        for raw in ["APP-20260101-00003", "APP-20260101-00012", "APP-20251231-00099"] {
            store
                .insert_application(number(raw), new_application(1, 1), Utc::now())
                .await
                .unwrap();
        }

        let last = store
            .last_application_number("APP-20260101-")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.sequence(), 12);
    }

    #[tokio::test]
    async fn fulfillment_linked_to_application() {
        let store = PostgresOrderStore::new(get_pool().await);
        let app = store
            .insert_application(number("APP-20260101-00001"), new_application(1, 4), Utc::now())
            .await
            .unwrap();

        let ful = store
            .insert_fulfillment(
                number("FUL-20260101-00001"),
                NewFulfillmentOrder {
                    application_order_id: Some(app.id),
                    factory_id: FactoryId::new(3),
                    product_id: ProductId::new(1),
                    quantity: 4,
                    remarks: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let linked = store
            .list_fulfillments_for_application(app.id)
            .await
            .unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, ful.id);

        let moved = store
            .update_fulfillment_status(
                ful.id,
                StatusUpdate::new(
                    FulfillmentStatus::Pending,
                    FulfillmentStatus::InProduction,
                    Utc::now(),
                ),
            )
            .await
            .unwrap();
        assert_eq!(moved.status, FulfillmentStatus::InProduction);

        let in_production = store
            .list_fulfillments(&FulfillmentFilter {
                factory_id: Some(FactoryId::new(3)),
                status: Some(FulfillmentStatus::InProduction),
            })
            .await
            .unwrap();
        assert_eq!(in_production.len(), 1);
    }

    #[tokio::test]
    async fn fulfillment_with_unknown_application_is_not_found() {
        let store = PostgresOrderStore::new(get_pool().await);
        let err = store
            .insert_fulfillment(
                number("FUL-20260101-00001"),
                NewFulfillmentOrder {
                    application_order_id: Some(OrderId::new(404)),
                    factory_id: FactoryId::new(3),
                    product_id: ProductId::new(1),
                    quantity: 4,
                    remarks: None,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 404, .. }));
    }
}

mod history {
    use super::*;

    fn entry(order_id: i64, from: &str, to: &str) -> NewStatusHistoryEntry {
        NewStatusHistoryEntry {
            order_kind: OrderKind::Application,
            order_id: OrderId::new(order_id),
            from_status: from.to_string(),
            to_status: to.to_string(),
            context: TransitionContext {
                operator_id: None,
                operator_name: Some("center-ops".to_string()),
                reason: None,
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn history_is_ordered_and_latest_is_last() {
        let store = PostgresOrderStore::new(get_pool().await);
        store.append(entry(1, "Pending", "Approved")).await.unwrap();
        store
            .append(entry(1, "Approved", "WaitingShipment"))
            .await
            .unwrap();
        store.append(entry(2, "Pending", "Rejected")).await.unwrap();

        let history = store
            .list_for_order(OrderKind::Application, OrderId::new(1))
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].to_status, "Approved");
        assert_eq!(history[1].to_status, "WaitingShipment");
        assert_eq!(history[0].operator_name.as_deref(), Some("center-ops"));

        let latest = store
            .latest_for_order(OrderKind::Application, OrderId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, history[1].id);
    }

    #[tokio::test]
    async fn duplicate_entries_are_kept() {
        let store = PostgresOrderStore::new(get_pool().await);
        store.append(entry(7, "Pending", "Approved")).await.unwrap();
        store.append(entry(7, "Pending", "Approved")).await.unwrap();

        let history = store
            .list_for_order(OrderKind::Application, OrderId::new(7))
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_ne!(history[0].id, history[1].id);
    }

    #[tokio::test]
    async fn kinds_are_separate() {
        let store = PostgresOrderStore::new(get_pool().await);
        store.append(entry(1, "Pending", "Approved")).await.unwrap();

        assert!(
            store
                .latest_for_order(OrderKind::Fulfillment, OrderId::new(1))
                .await
                .unwrap()
                .is_none()
        );
    }
}
