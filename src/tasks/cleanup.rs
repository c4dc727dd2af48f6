//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheStore, CacheValue};

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task sleeps for `interval` between runs and takes the write lock only
/// for the sweep itself. It holds a weak reference to the store and exits on
/// its own once the store has been dropped; callers that stop earlier abort
/// the returned handle.
///
/// # Arguments
/// * `cache` - Shared reference to the store
/// * `interval` - Time between cleanup runs
pub fn spawn_cleanup_task<V: CacheValue>(
    cache: Arc<RwLock<CacheStore<V>>>,
    interval: Duration,
) -> JoinHandle<()> {
    let cache = Arc::downgrade(&cache);

    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs_f64(),
            "Starting TTL cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache store dropped, stopping TTL cleanup task");
                break;
            };

            let removed = cache.write().await.cleanup_expired();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOptions, StoreConfig};

    fn shared_store() -> Arc<RwLock<CacheStore<String>>> {
        Arc::new(RwLock::new(CacheStore::new(StoreConfig::new(100, 1024))))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = shared_store();
        cache
            .write()
            .await
            .set("expire_soon", "value".to_string(), &CacheOptions::new().ttl_secs(1))
            .unwrap();

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(2500)).await;

        // len() counts resident entries, expired or not
        assert_eq!(cache.read().await.len(), 0, "Expired entry should have been swept");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = shared_store();
        cache
            .write()
            .await
            .set("long_lived", "value".to_string(), &CacheOptions::new().ttl_secs(3600))
            .unwrap();

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.write().await.get("long_lived"), Some("value".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(shared_store(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_exits_when_store_dropped() {
        let cache = shared_store();
        let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(1));

        drop(cache);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(handle.is_finished(), "Task should stop once the store is gone");
    }
}
