//! Persistence for the inventory and order services.
//!
//! Each capability is a trait with a PostgreSQL implementation for
//! deployments and an in-memory implementation for tests and local runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryProductRepository};
pub use postgres::{PostgresOrderStore, PostgresProductRepository};
pub use repository::{
    ApplicationFilter, ApplicationOrderRepository, FulfillmentFilter, FulfillmentOrderRepository,
    HistoryRepository, OrderStore, ProductRepository, StatusUpdate,
};
