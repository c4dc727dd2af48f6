//! Cache Module
//!
//! Provides the bounded in-memory store: TTL expiration, memory accounting,
//! tag invalidation and score-based eviction.

mod entry;
mod eviction;
mod options;
mod stats;
mod store;


use std::time::Duration;

use serde::Serialize;

// Re-export public types
pub use entry::{estimate_size, CacheEntry, PRIMITIVE_SIZE};
pub use eviction::{score, select_victim, EvictionMode, AGE_PENALTY_DIVISOR};
pub use options::CacheOptions;
pub use stats::CacheStats;
pub use store::{CacheStore, StoreConfig};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// TTL applied when neither the write nor the store specifies one
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Longest TTL an entry can carry; larger TTLs are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Value ==
/// Bounds for values shared across tasks.
pub trait CacheValue: Clone + Serialize + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + Send + Sync + 'static {}
