//! Order service entry point.

use api::config::{Config, ORDER_PORT};

#[tokio::main]
async fn main() {
    let config = Config::from_env(ORDER_PORT);

    api::telemetry::init_tracing(&config);
    let metrics_handle =
        api::telemetry::install_metrics().expect("failed to install Prometheus recorder");

    // Seeds the order number sequences before the first request.
    let state = api::bootstrap::order_state(&config)
        .await
        .expect("failed to initialise the order service");

    let app = api::create_order_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, ledger = ?config.inventory_url, "starting order service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("order service shut down gracefully");
}
