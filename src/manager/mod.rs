//! Cache Manager Module
//!
//! Orchestrates the in-memory store and an optional secondary backend, and
//! adds memoization, pattern invalidation, warm-up and the sweep lifecycle.

mod backend;
mod function;
mod singleflight;

use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use regex::Regex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheOptions, CacheStats, CacheStore, CacheValue, StoreConfig};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::spawn_cleanup_task;

pub use backend::{NoopBackend, SecondaryBackend};
pub use function::CachedFunction;
use singleflight::Singleflight;

/// Default interval between background sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Default bound on a single secondary backend call.
pub const DEFAULT_SECONDARY_TIMEOUT: Duration = Duration::from_millis(250);

// == Warm-up Entry ==
/// One item of a [`CacheManager::warm_up`] batch.
#[derive(Debug, Clone)]
pub struct WarmUpEntry<V> {
    pub key: String,
    pub value: V,
    pub options: CacheOptions,
}

impl<V> WarmUpEntry<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            options: CacheOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }
}

// == Cache Manager ==
/// Uniform caching API over the in-memory store and an optional secondary
/// backend.
///
/// The background sweep is owned by the manager: [`start`](Self::start)
/// spawns it, [`stop`](Self::stop) or dropping the manager cancels it.
pub struct CacheManager<V: CacheValue> {
    store: Arc<RwLock<CacheStore<V>>>,
    secondary: Option<Arc<dyn SecondaryBackend<V>>>,
    secondary_timeout: Duration,
    cleanup_interval: Duration,
    cleanup_handle: Mutex<Option<JoinHandle<()>>>,
    in_flight: Singleflight<V>,
}

impl<V: CacheValue> CacheManager<V> {
    // == Constructors ==
    /// Creates a manager with only the in-memory backend.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(CacheStore::new(config))),
            secondary: None,
            secondary_timeout: DEFAULT_SECONDARY_TIMEOUT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            cleanup_handle: Mutex::new(None),
            in_flight: Singleflight::new(),
        }
    }

    /// Creates a manager from server configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.store_config())
            .with_cleanup_interval(Duration::from_secs(config.cleanup_interval))
            .with_secondary_timeout(Duration::from_millis(config.secondary_timeout_ms))
    }

    /// Attaches a secondary backend consulted after primary misses.
    pub fn with_secondary(mut self, backend: Arc<dyn SecondaryBackend<V>>) -> Self {
        self.secondary = Some(backend);
        self
    }

    pub fn with_secondary_timeout(mut self, timeout: Duration) -> Self {
        self.secondary_timeout = timeout;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Shared handle to the primary store.
    pub fn store(&self) -> &Arc<RwLock<CacheStore<V>>> {
        &self.store
    }

    // == Sweep Lifecycle ==
    /// Starts the background expiry sweep. Does nothing if it is running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut handle = self.cleanup_slot();
        if handle.as_ref().is_some_and(|running| !running.is_finished()) {
            return;
        }

        *handle = Some(spawn_cleanup_task(self.store.clone(), self.cleanup_interval));
        info!(
            interval_secs = self.cleanup_interval.as_secs(),
            "Cache sweep started"
        );
    }

    /// Cancels the background sweep if it is running.
    pub fn stop(&self) {
        if let Some(handle) = self.cleanup_slot().take() {
            handle.abort();
            info!("Cache sweep stopped");
        }
    }

    /// Returns true while the background sweep is running.
    pub fn is_running(&self) -> bool {
        self.cleanup_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // == Get ==
    /// Looks up a value, falling through to the secondary backend on a
    /// primary miss.
    ///
    /// Never fails: secondary errors and timeouts are logged and reported as
    /// a miss. A secondary hit is copied into the primary store.
    pub async fn get(&self, key: &str) -> Option<V> {
        let primary = self.store.write().await.get(key);
        if primary.is_some() {
            return primary;
        }

        let backend = self.secondary.as_ref()?;
        let value = self.call_secondary("get", key, backend.get(key)).await??;

        debug!(key, "secondary backend hit, back-filling primary");
        let backfill = self
            .store
            .write()
            .await
            .set(key, value.clone(), &CacheOptions::default());
        if let Err(err) = backfill {
            warn!(key, error = %err, "failed to back-fill primary from secondary");
        }

        Some(value)
    }

    // == Set ==
    /// Stores a value in the primary store and mirrors it to the secondary.
    pub async fn set(&self, key: &str, value: V, options: CacheOptions) -> Result<()> {
        match &self.secondary {
            Some(backend) => {
                self.store
                    .write()
                    .await
                    .set(key, value.clone(), &options)?;
                self.call_secondary("set", key, backend.set(key, value, &options))
                    .await;
            }
            None => self.store.write().await.set(key, value, &options)?,
        }
        Ok(())
    }

    // == Delete ==
    /// Removes a key from both backends. Returns true iff the primary held it.
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self.store.write().await.delete(key);
        if let Some(backend) = &self.secondary {
            self.call_secondary("delete", key, backend.delete(key)).await;
        }
        removed
    }

    /// Returns true if the primary store holds a live entry for `key`.
    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    /// Empties both backends and resets statistics.
    pub async fn clear(&self) {
        self.store.write().await.clear();
        if let Some(backend) = &self.secondary {
            self.call_secondary("clear", "*", backend.clear()).await;
        }
        info!("Cache cleared");
    }

    // == Memoization ==
    /// Returns the cached value for `key`, or runs `producer` once and caches
    /// its result.
    ///
    /// Concurrent callers missing on the same key share a single producer run.
    pub async fn cached<F, Fut>(&self, key: &str, producer: F, options: CacheOptions) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let result = self
            .try_cached(
                key,
                || async move { Ok::<V, Infallible>(producer().await) },
                options,
            )
            .await;

        match result {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`cached`](Self::cached).
    ///
    /// A producer error is returned to the caller and nothing is cached.
    pub async fn try_cached<F, Fut, E>(
        &self,
        key: &str,
        producer: F,
        options: CacheOptions,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        self.in_flight
            .run(key, || async move {
                // Another caller may have finished populating the key between
                // our miss and registering this call.
                let populated = self.store.read().await.peek(key);
                if let Some(value) = populated {
                    return Ok(value);
                }

                let value = match producer().await {
                    Ok(value) => value,
                    Err(err) => return Err(err),
                };
                if let Err(err) = self.set(key, value.clone(), options).await {
                    warn!(key, error = %err, "memoized value not cached");
                }
                Ok(value)
            })
            .await
    }

    /// Wraps `func` so each call is cached under `key_generator(&args)`.
    pub fn cache_function<A, F, Fut, K>(
        self: &Arc<Self>,
        func: F,
        key_generator: K,
        options: CacheOptions,
    ) -> CachedFunction<V, F, K>
    where
        K: Fn(&A) -> String,
        F: Fn(A) -> Fut,
        Fut: Future<Output = V>,
    {
        CachedFunction::new(Arc::clone(self), func, key_generator, options)
    }

    // == Invalidation ==
    /// Removes every resident key matching `pattern`.
    ///
    /// Removed keys are also deleted from the secondary backend so a later
    /// miss cannot back-fill them.
    pub async fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let removed = self
            .store
            .write()
            .await
            .invalidate_keys_matching(|key| pattern.is_match(key));
        debug!(pattern = %pattern, removed = removed.len(), "invalidated keys by pattern");
        self.delete_from_secondary(&removed).await;
        removed.len()
    }

    /// Compiles `pattern` and removes every resident key matching it.
    pub async fn invalidate_pattern_str(&self, pattern: &str) -> Result<usize> {
        let pattern = Regex::new(pattern)?;
        Ok(self.invalidate_pattern(&pattern).await)
    }

    /// Removes every entry carrying at least one of `tags`, in both backends.
    pub async fn invalidate_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let removed = self.store.write().await.invalidate_by_tags(tags);
        debug!(removed = removed.len(), "invalidated entries by tag");
        self.delete_from_secondary(&removed).await;
        removed.len()
    }

    // == Warm-up ==
    /// Writes a batch of entries in order.
    ///
    /// Stops at the first failed write; entries written before it stay cached.
    pub async fn warm_up<I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = WarmUpEntry<V>>,
    {
        let mut warmed = 0;
        for WarmUpEntry {
            key,
            value,
            options,
        } in entries
        {
            self.set(&key, value, options).await?;
            warmed += 1;
        }

        info!(warmed, "Cache warm-up complete");
        Ok(warmed)
    }

    // == Stats ==
    /// Returns the primary store's statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Internals ==
    async fn delete_from_secondary(&self, keys: &[String]) {
        let Some(backend) = &self.secondary else {
            return;
        };
        for key in keys {
            self.call_secondary("delete", key, backend.delete(key)).await;
        }
    }

    async fn call_secondary<T, Fut>(&self, op: &'static str, key: &str, call: Fut) -> Option<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.secondary_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                warn!(op, key, error = %err, "secondary backend call failed");
                None
            }
            Err(_) => {
                warn!(
                    op,
                    key,
                    timeout_ms = self.secondary_timeout.as_millis() as u64,
                    "secondary backend call timed out"
                );
                None
            }
        }
    }

    fn cleanup_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.cleanup_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: CacheValue> Drop for CacheManager<V> {
    fn drop(&mut self) {
        let handle = self
            .cleanup_handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
