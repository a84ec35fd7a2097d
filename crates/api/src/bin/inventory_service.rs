//! Inventory service entry point.

use api::config::{Config, INVENTORY_PORT};

#[tokio::main]
async fn main() {
    let config = Config::from_env(INVENTORY_PORT);

    // 1. Initialize tracing
    api::telemetry::init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle =
        api::telemetry::install_metrics().expect("failed to install Prometheus recorder");

    // 3. Wire the ledger over its repository and lock store
    let state = api::bootstrap::inventory_state(&config)
        .await
        .expect("failed to initialise the inventory service");

    // 4. Build the application
    let app = api::create_inventory_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting inventory service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("inventory service shut down gracefully");
}
