//! Cache Options Module
//!
//! Per-write settings accepted by every `set`-style operation.

use std::time::Duration;

// == Cache Options ==
/// Options attached to a single write.
///
/// `compress` is accepted and carried but has no effect: values are kept
/// in memory as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Time to live; `None` falls back to the store's default TTL
    pub ttl: Option<Duration>,
    /// Labels used for group invalidation
    pub tags: Vec<String>,
    /// Reserved, no-op
    pub compress: bool,
    /// Estimate structured values from their canonical JSON form
    pub serialize: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            tags: Vec::new(),
            compress: false,
            serialize: true,
        }
    }
}

impl CacheOptions {
    // == Constructor ==
    /// Creates options with the store defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit TTL.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets an explicit TTL in whole seconds.
    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Duration::from_secs(secs))
    }

    /// Replaces the tag list.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }
}
