//! Cache Store Module
//!
//! Main cache engine: bounded HashMap storage with TTL expiration,
//! memory accounting, tag invalidation and score-based eviction.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{
    estimate_size, select_victim, CacheEntry, CacheOptions, CacheStats, EvictionMode,
    DEFAULT_TTL_SECS, MAX_KEY_LENGTH,
};
use crate::error::{CacheError, Result};

// == Store Config ==
/// Limits and defaults for a [`CacheStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of resident entries (at least 1)
    pub max_size: usize,
    /// Maximum sum of value sizes in bytes
    pub max_memory: usize,
    /// TTL applied when a write does not specify one
    pub default_ttl: Duration,
    /// How aggressively a `set` evicts
    pub eviction_mode: EvictionMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            max_memory: 100 * 1024 * 1024,
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            eviction_mode: EvictionMode::UntilFits,
        }
    }
}

impl StoreConfig {
    /// Creates a config with the given limits and default TTL and mode.
    pub fn new(max_size: usize, max_memory: usize) -> Self {
        Self {
            max_size,
            max_memory,
            ..Self::default()
        }
    }

    pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    pub fn with_eviction_mode(mut self, eviction_mode: EvictionMode) -> Self {
        self.eviction_mode = eviction_mode;
        self
    }
}

// == Cache Store ==
/// Bounded in-memory store.
///
/// Not synchronized on its own; share it behind `Arc<RwLock<_>>`.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance counters
    stats: CacheStats,
    /// Sum of resident entry sizes
    total_size: usize,
    /// Limits and defaults
    config: StoreConfig,
}

impl<V: Clone + Serialize> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store. A `max_size` of zero is raised to one.
    pub fn new(mut config: StoreConfig) -> Self {
        config.max_size = config.max_size.max(1);

        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            total_size: 0,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // == Set ==
    /// Stores a value, replacing any previous entry for the key.
    ///
    /// Evicts the lowest-scoring entries first when the new entry would break
    /// the count or memory limit. A value whose size alone exceeds
    /// `max_memory` is rejected without touching the store.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `options` - TTL, tags and sizing options
    pub fn set(&mut self, key: impl Into<String>, value: V, options: &CacheOptions) -> Result<()> {
        let key = key.into();

        if key.is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        let size = estimate_size(&value, options.serialize);
        if size > self.config.max_memory {
            return Err(CacheError::ValueTooLarge {
                key,
                size,
                max_memory: self.config.max_memory,
            });
        }

        // Overwrite frees the old entry's budget before eviction is considered
        self.remove_entry(&key);
        self.make_room(size);

        let ttl = options.ttl.unwrap_or(self.config.default_ttl);
        let entry = CacheEntry::new(key.clone(), value, ttl, options.tags.iter().cloned(), size);
        self.total_size += size;
        self.entries.insert(key, entry);
        self.stats.record_set();

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns a clone of the value if found and not expired, bumping the
    /// entry's hit counter. Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_miss();
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.hits += 1;
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Peek ==
    /// Returns a live value without touching counters or removing anything.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    // == Has ==
    /// Returns true if a live entry exists. Expired entries are removed.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };

        if expired {
            self.remove_entry(key);
        }
        !expired
    }

    // == Delete ==
    /// Removes an entry by key. Returns true iff an entry existed.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.remove_entry(key).is_some() {
            self.stats.record_delete();
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every entry and resets all counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
        self.stats = CacheStats::new();
    }

    // == Invalidation ==
    /// Removes every entry carrying at least one of `tags`.
    ///
    /// Returns the keys of the removed entries.
    pub fn invalidate_by_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> Vec<String> {
        let tags: HashSet<&str> = tags.iter().map(AsRef::as_ref).collect();
        if tags.is_empty() {
            return Vec::new();
        }

        let removed = self.remove_matching(|entry| entry.has_any_tag(&tags));
        self.stats.deletes += removed.len() as u64;
        removed
    }

    /// Removes every entry whose key satisfies `predicate`.
    ///
    /// Returns the keys of the removed entries.
    pub fn invalidate_keys_matching<F>(&mut self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let removed = self.remove_matching(|entry| predicate(&entry.key));
        self.stats.deletes += removed.len() as u64;
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        self.remove_matching(|entry| entry.is_expired_at(now)).len()
    }

    // == Keys ==
    /// Returns the keys of all live entries.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let overhead: usize = self.entries.values().map(CacheEntry::overhead).sum();
        self.stats
            .snapshot(self.entries.len(), self.total_size, self.total_size + overhead)
    }

    // == Length ==
    /// Returns the current number of resident entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the sum of resident value sizes in bytes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    // == Internals ==
    fn needs_room(&self, incoming: usize) -> bool {
        !self.entries.is_empty()
            && (self.entries.len() >= self.config.max_size
                || self.total_size + incoming > self.config.max_memory)
    }

    fn make_room(&mut self, incoming: usize) {
        if !self.needs_room(incoming) {
            return;
        }

        // Expired entries are already logically absent; drop them before
        // evicting anything live.
        let reaped = self.cleanup_expired();
        if reaped > 0 {
            debug!(reaped, "reaped expired entries before eviction");
        }

        while self.needs_room(incoming) {
            let now = Instant::now();
            let Some(victim) = select_victim(self.entries.values(), now).map(str::to_owned) else {
                break;
            };

            if let Some(entry) = self.remove_entry(&victim) {
                debug!(key = %victim, hits = entry.hits, size = entry.size, "evicted cache entry");
            }
            self.stats.record_eviction();

            if self.config.eviction_mode == EvictionMode::SingleShot {
                break;
            }
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.total_size -= entry.size;
        Some(entry)
    }

    fn remove_matching<F>(&mut self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&CacheEntry<V>) -> bool,
    {
        let mut removed = Vec::new();
        let mut freed = 0;
        self.entries.retain(|key, entry| {
            if predicate(entry) {
                freed += entry.size;
                removed.push(key.clone());
                false
            } else {
                true
            }
        });
        self.total_size -= freed;
        removed
    }
}
