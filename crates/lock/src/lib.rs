//! Distributed locking for the inventory ledger.
//!
//! This crate provides two layers:
//! - [`DistributedLock`]: acquire/release of a named, time-bounded token held
//!   in a shared [`LockStore`] (Redis in production, memory in tests)
//! - [`LockService`]: runs a unit of work while holding exactly one lock and
//!   releases it on every exit path
//!
//! Exclusivity lasts only as long as the token's TTL. A unit of work that
//! outlives its TTL can lose the lock while still running, so callers must
//! size the TTL well above the expected critical-section duration.

pub mod error;
pub mod executor;
pub mod lock;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{LockError, Result};
pub use executor::LockService;
pub use lock::{DistributedLock, LockToken};
pub use memory::InMemoryLockStore;
pub use redis_store::RedisLockStore;
pub use store::LockStore;
