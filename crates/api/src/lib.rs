//! HTTP services for the stock ledger and the order lifecycle.
//!
//! Two independently deployable routers share this crate: the inventory
//! service owns the product ledger, the order service runs the sagas and
//! calls the ledger over HTTP (or in process when no ledger URL is set).
//! Both carry structured logging (tracing) and Prometheus metrics.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::SequenceGenerator;
use inventory::InventoryLedger;
use lock::LockStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    ApplicationOrderService, FulfillmentOrderService, HistoryService, LedgerClient, OrderLocks,
    StatusWritePolicy, seed_order_numbers,
};
use store::{OrderStore, ProductRepository, StoreError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::{InventoryState, OrderState};

/// Creates the inventory service router.
pub fn create_inventory_app<R, S>(
    state: Arc<InventoryState<R, S>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    R: ProductRepository + 'static,
    S: LockStore + Clone + 'static,
{
    use routes::{ledger, products};

    Router::new()
        .route("/health", get(routes::health::inventory))
        .route("/reserve", post(ledger::reserve::<R, S>))
        .route("/release", post(ledger::release::<R, S>))
        .route("/confirm", post(ledger::confirm::<R, S>))
        .route("/restock", post(ledger::restock::<R, S>))
        .route("/stats/{product_id}", get(ledger::stats::<R, S>))
        .route(
            "/products",
            post(products::create::<R, S>).get(products::list::<R, S>),
        )
        .route("/products/{id}", get(products::get::<R, S>))
        .route(
            "/products/center/{center_id}",
            get(products::list_by_center::<R, S>),
        )
        .with_state(state)
        .merge(metrics_router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

/// Creates the order service router.
pub fn create_order_app<L, S>(
    state: Arc<OrderState<L, S>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    use routes::{applications as app, fulfillments as ful, history};

    Router::new()
        .route("/health", get(routes::health::orders))
        .route(
            "/applications",
            post(app::create::<L, S>).get(app::list::<L, S>),
        )
        .route("/applications/{id}", get(app::get::<L, S>))
        .route(
            "/applications/number/{order_number}",
            get(app::get_by_number::<L, S>),
        )
        .route("/applications/{id}/approve", post(app::approve::<L, S>))
        .route("/applications/{id}/reject", post(app::reject::<L, S>))
        .route(
            "/applications/{id}/waiting-shipment",
            post(app::waiting_shipment::<L, S>),
        )
        .route("/applications/{id}/ship", post(app::ship::<L, S>))
        .route("/applications/{id}/in-transit", post(app::in_transit::<L, S>))
        .route("/applications/{id}/complete", post(app::complete::<L, S>))
        .route(
            "/fulfillments",
            post(ful::create::<L, S>).get(ful::list::<L, S>),
        )
        .route("/fulfillments/{id}", get(ful::get::<L, S>))
        .route(
            "/fulfillments/number/{order_number}",
            get(ful::get_by_number::<L, S>),
        )
        .route(
            "/fulfillments/application/{application_order_id}",
            get(ful::list_for_application::<L, S>),
        )
        .route("/fulfillments/{id}/accept", post(ful::accept::<L, S>))
        .route(
            "/fulfillments/{id}/waiting-shipment",
            post(ful::waiting_shipment::<L, S>),
        )
        .route("/fulfillments/{id}/ship", post(ful::ship::<L, S>))
        .route("/fulfillments/{id}/complete", post(ful::complete::<L, S>))
        .route("/history/{order_kind}/{order_id}", get(history::list::<L, S>))
        .route(
            "/history/{order_kind}/{order_id}/latest",
            get(history::latest::<L, S>),
        )
        .with_state(state)
        .merge(metrics_router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

/// Wraps a ledger in inventory service state.
pub fn create_inventory_state<R, S>(ledger: Arc<InventoryLedger<R, S>>) -> Arc<InventoryState<R, S>> {
    Arc::new(InventoryState { ledger })
}

/// Wires the order services over one ledger client and one store.
///
/// `locks` serializes ledger-guarded transitions per order and must be
/// shared by every order service process. The order number sequences are
/// seeded from the store first.
pub async fn create_order_state<L, S>(
    ledger: L,
    store: S,
    locks: OrderLocks,
    policy: StatusWritePolicy,
) -> Result<Arc<OrderState<L, S>>, StoreError>
where
    L: LedgerClient + Clone + 'static,
    S: OrderStore + Clone + 'static,
{
    let numbers = Arc::new(SequenceGenerator::default());
    seed_order_numbers(&numbers, &store).await?;

    let fulfillments = FulfillmentOrderService::new(
        ledger.clone(),
        store.clone(),
        numbers.clone(),
        locks.clone(),
        policy,
    );
    let applications = ApplicationOrderService::new(
        ledger,
        store.clone(),
        numbers,
        fulfillments.clone(),
        locks,
        policy,
    );

    Ok(Arc::new(OrderState {
        applications,
        fulfillments,
        history: HistoryService::new(store),
    }))
}

fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(handle)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}
