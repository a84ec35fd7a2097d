//! Redis integration tests for the lock store.
//!
//! These tests use a shared Redis container. Run with:
//!
//! ```bash
//! cargo test -p lock --test redis_integration
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lock::{DistributedLock, LockError, LockService, LockStore, RedisLockStore};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Redis>,
    url: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Redis::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(6379).await.unwrap();

            Arc::new(ContainerInfo {
                container,
                url: format!("redis://{host}:{port}"),
            })
        })
        .await
        .clone()
}

async fn get_store() -> RedisLockStore {
    let info = get_container_info().await;
    RedisLockStore::connect(&info.url).await.unwrap()
}

fn unique_key(name: &str) -> String {
    format!("ledger:lock:test:{name}:{}", uuid_suffix())
}

fn uuid_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

#[tokio::test]
async fn set_if_absent_is_exclusive() {
    let store = get_store().await;
    let key = unique_key("exclusive");

    assert!(store.set_if_absent(&key, "a", Duration::from_secs(5)).await.unwrap());
    assert!(!store.set_if_absent(&key, "b", Duration::from_secs(5)).await.unwrap());
    assert!(store.delete_if_equals(&key, "a").await.unwrap());
}

#[tokio::test]
async fn release_script_only_deletes_own_token() {
    let store = get_store().await;
    let key = unique_key("owner");

    store.set_if_absent(&key, "owner", Duration::from_secs(5)).await.unwrap();
    assert!(!store.delete_if_equals(&key, "intruder").await.unwrap());
    assert!(!store.set_if_absent(&key, "x", Duration::from_secs(5)).await.unwrap());
    assert!(store.delete_if_equals(&key, "owner").await.unwrap());
    assert!(!store.delete_if_equals(&key, "owner").await.unwrap());
}

#[tokio::test]
async fn key_expires_after_ttl() {
    let store = get_store().await;
    let lock = DistributedLock::new(store);
    let key = unique_key("ttl");

    let stale = lock
        .acquire(&key, Duration::from_millis(100))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let fresh = lock.acquire(&key, Duration::from_secs(5)).await.unwrap();
    assert!(fresh.is_some());
    assert!(!lock.release(&stale).await.unwrap());
    assert!(lock.release(&fresh.unwrap()).await.unwrap());
}

#[tokio::test]
async fn with_lock_serializes_concurrent_callers() {
    let store = get_store().await;
    let service = Arc::new(LockService::new(store));
    let key = Arc::new(unique_key("serial"));
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let key = key.clone();
        let inside = inside.clone();
        let max_inside = max_inside.clone();
        handles.push(tokio::spawn(async move {
            let (inside, max_inside) = (&inside, &max_inside);
            loop {
                let result: Result<(), LockError> = service
                    .with_lock(&key, Duration::from_secs(5), || async move {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await;
                match result {
                    Ok(()) => break,
                    Err(LockError::AcquisitionFailed { .. }) => {
                        tokio::time::sleep(Duration::from_millis(1)).await
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_store_reports_unavailable() {
    let result = RedisLockStore::connect("redis://127.0.0.1:1").await;
    assert!(matches!(result, Err(LockError::StoreUnavailable(_))));
}
