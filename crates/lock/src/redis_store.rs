//! Redis-backed lock store.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;

use crate::{LockStore, Result};

/// Compare-and-delete executed server-side so no other client can
/// interleave between the GET and the DEL.
const RELEASE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

/// Lock store backed by a shared Redis instance.
///
/// Acquisition uses `SET key value NX PX ttl`; release runs a Lua script
/// that deletes the key only when it still holds the caller's token.
#[derive(Clone)]
pub struct RedisLockStore {
    conn: ConnectionManager,
    release_script: Script,
}

impl RedisLockStore {
    /// Creates a lock store over an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            release_script: Script::new(RELEASE_SCRIPT),
        }
    }

    /// Connects to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;

        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.conn.clone();

        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;

        Ok(deleted == 1)
    }
}
