//! Builds service state from configuration: PostgreSQL or in-memory
//! repositories, Redis or in-memory locks, HTTP or in-process ledger.

use std::sync::Arc;

use inventory::InventoryLedger;
use lock::{InMemoryLockStore, LockError, LockStore, RedisLockStore};
use saga::{HttpLedgerClient, LedgerClient, LocalLedgerClient, OrderLocks, StatusWritePolicy};
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use store::{
    InMemoryOrderStore, InMemoryProductRepository, OrderStore, PostgresOrderStore,
    PostgresProductRepository, ProductRepository, StoreError,
};
use thiserror::Error;

use crate::config::Config;
use crate::state::{InventoryState, OrderState};

pub type SharedProducts = Arc<dyn ProductRepository>;
pub type SharedLocks = Arc<dyn LockStore>;
pub type SharedOrders = Arc<dyn OrderStore>;
pub type SharedLedgerClient = Arc<dyn LedgerClient>;

/// Errors raised while wiring a service at start-up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] MigrateError),

    #[error("Lock store connection failed: {0}")]
    Lock(#[from] LockError),

    #[error("Ledger client could not be built: {0}")]
    LedgerClient(#[from] reqwest::Error),

    #[error("Order numbers could not be seeded: {0}")]
    Store(#[from] StoreError),
}

/// The product ledger over the configured repository and lock store.
pub async fn inventory_ledger(
    config: &Config,
) -> Result<InventoryLedger<SharedProducts, SharedLocks>, BootstrapError> {
    let products: SharedProducts = match &config.database_url {
        Some(url) => {
            let repository = PostgresProductRepository::new(connect(url).await?);
            repository.run_migrations().await?;
            tracing::info!("product repository: postgres");
            Arc::new(repository)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; products are kept in memory");
            Arc::new(InMemoryProductRepository::new())
        }
    };

    let locks = lock_store(config, "product").await?;
    Ok(InventoryLedger::new(products, locks, config.lock_ttl))
}

/// State of the inventory service.
pub async fn inventory_state(
    config: &Config,
) -> Result<Arc<InventoryState<SharedProducts, SharedLocks>>, BootstrapError> {
    let ledger = inventory_ledger(config).await?;
    Ok(crate::create_inventory_state(Arc::new(ledger)))
}

/// State of the order service.
pub async fn order_state(
    config: &Config,
) -> Result<Arc<OrderState<SharedLedgerClient, SharedOrders>>, BootstrapError> {
    let store: SharedOrders = match &config.database_url {
        Some(url) => {
            let store = PostgresOrderStore::new(connect(url).await?);
            store.run_migrations().await?;
            tracing::info!("order store: postgres");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; orders are kept in memory");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    let ledger: SharedLedgerClient = match &config.inventory_url {
        Some(url) => {
            tracing::info!(inventory_url = %url, "ledger client: http");
            Arc::new(HttpLedgerClient::new(url.as_str(), config.ledger_timeout)?)
        }
        None => {
            tracing::warn!("INVENTORY_URL not set; running the ledger in process");
            Arc::new(LocalLedgerClient::new(Arc::new(
                inventory_ledger(config).await?,
            )))
        }
    };

    // An order lock covers one ledger call and the status write after it.
    let locks = OrderLocks::new(
        lock_store(config, "order").await?,
        config.ledger_timeout + config.lock_ttl,
    );
    let policy = StatusWritePolicy::new(config.status_write_attempts);
    Ok(crate::create_order_state(ledger, store, locks, policy).await?)
}

async fn lock_store(config: &Config, purpose: &'static str) -> Result<SharedLocks, LockError> {
    match &config.redis_url {
        Some(url) => {
            let store = RedisLockStore::connect(url).await?;
            tracing::info!(purpose, "lock store: redis");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(purpose, "REDIS_URL not set; locks only hold within this process");
            Ok(Arc::new(InMemoryLockStore::new()))
        }
    }
}

async fn connect(url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new().max_connections(10).connect(url).await
}
