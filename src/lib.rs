//! Tiered Cache - an in-process caching engine
//!
//! Bounded key/value storage with TTL expiration, hit-weighted eviction,
//! tag and pattern invalidation, memoization with in-flight deduplication,
//! an optional secondary backend, and an axum response-cache middleware.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http_cache;
pub mod manager;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheOptions, CacheStats, CacheStore, EvictionMode, StoreConfig};
pub use config::Config;
pub use error::{CacheError, Result};
pub use http_cache::{http_cache_layer, HttpCacheConfig, HttpCacheState};
pub use manager::{CacheManager, NoopBackend, SecondaryBackend, WarmUpEntry};
pub use tasks::spawn_cleanup_task;
