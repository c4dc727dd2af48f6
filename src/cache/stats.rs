//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Cumulative counters plus a snapshot of the store's size.
///
/// Counters only grow until the store is cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of successful writes
    pub sets: u64,
    /// Number of entries removed explicitly (delete or invalidation)
    pub deletes: u64,
    /// Number of entries evicted to satisfy capacity limits
    pub evictions: u64,
    /// Current number of resident entries
    pub total_keys: usize,
    /// Sum of resident value sizes in bytes
    pub total_size: usize,
    /// Value sizes plus key and tag overhead in bytes
    pub memory_usage: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    /// misses / (hits + misses)
    pub miss_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Miss Rate ==
    /// Returns 1 - hit rate, or 0.0 if no requests have been made.
    pub fn miss_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            1.0 - self.hit_rate()
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Snapshot ==
    /// Returns a copy with the size fields and derived rates filled in.
    pub fn snapshot(&self, total_keys: usize, total_size: usize, memory_usage: usize) -> Self {
        Self {
            total_keys,
            total_size,
            memory_usage,
            hit_rate: self.hit_rate(),
            miss_rate: self.miss_rate(),
            ..self.clone()
        }
    }
}
