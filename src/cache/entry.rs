//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and the size estimator
//! used for memory accounting.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::cache::MAX_TTL;

/// Bytes charged for numbers, booleans, null and unserializable values.
pub const PRIMITIVE_SIZE: usize = 8;

// == Cache Entry ==
/// A single resident value with its metadata.
///
/// Only `hits` changes after creation; an overwrite replaces the entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Key the entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Creation instant
    pub created_at: Instant,
    /// Expiration instant (creation + TTL)
    pub expires_at: Instant,
    /// Invalidation labels
    pub tags: HashSet<String>,
    /// Successful reads since creation
    pub hits: u64,
    /// Estimated size in bytes, fixed at insertion
    pub size: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now. TTLs above [`MAX_TTL`]
    /// are clamped to it.
    ///
    /// # Arguments
    /// * `key` - The key the entry is stored under
    /// * `value` - The value to store
    /// * `ttl` - Time to live
    /// * `tags` - Invalidation labels
    /// * `size` - Precomputed size estimate (see [`estimate_size`])
    pub fn new<I>(key: String, value: V, ttl: Duration, tags: I, size: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let now = Instant::now();

        Self {
            key,
            value,
            created_at: now,
            expires_at: now + ttl.min(MAX_TTL),
            tags: tags.into_iter().collect(),
            hits: 0,
            size,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining TTL, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Returns how long ago the entry was created.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.created_at)
    }

    // == Tags ==
    /// Returns true if the entry carries at least one of `tags`.
    pub fn has_any_tag(&self, tags: &HashSet<&str>) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag.as_str()))
    }

    /// Bytes charged for the key and tags, on top of the value size.
    pub fn overhead(&self) -> usize {
        utf16_bytes(&self.key) + self.tags.iter().map(|tag| utf16_bytes(tag)).sum::<usize>()
    }
}

// == Size Estimation ==
/// Estimates the in-memory size of a value in bytes.
///
/// Strings cost 2 bytes per UTF-16 code unit. Arrays and objects cost 2 bytes
/// per code unit of their canonical JSON text when `serialize` is set, and a
/// flat [`PRIMITIVE_SIZE`] otherwise. Everything else costs [`PRIMITIVE_SIZE`].
/// The result is deterministic for equal values.
pub fn estimate_size<V: Serialize + ?Sized>(value: &V, serialize: bool) -> usize {
    match serde_json::to_value(value) {
        Ok(Value::String(text)) => utf16_bytes(&text),
        Ok(structured @ (Value::Array(_) | Value::Object(_))) if serialize => {
            utf16_bytes(&structured.to_string())
        }
        _ => PRIMITIVE_SIZE,
    }
}

fn utf16_bytes(text: &str) -> usize {
    text.encode_utf16().count() * 2
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(ttl_secs: u64, tags: &[&str]) -> CacheEntry<String> {
        CacheEntry::new(
            "key".to_string(),
            "value".to_string(),
            Duration::from_secs(ttl_secs),
            tags.iter().map(|t| t.to_string()),
            10,
        )
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry(60, &["a", "b"]);

        assert_eq!(entry.value, "value");
        assert_eq!(entry.hits, 0);
        assert_eq!(entry.size, 10);
        assert_eq!(entry.tags.len(), 2);
        assert!(!entry.is_expired());
        assert_eq!(entry.expires_at - entry.created_at, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = entry(1, &[]);
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_remaining_and_age() {
        let entry = entry(10, &[]);

        tokio::time::advance(Duration::from_secs(4)).await;

        assert_eq!(entry.ttl_remaining(), Duration::from_secs(6));
        assert_eq!(entry.age(), Duration::from_secs(4));
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let entry = entry(u64::MAX, &[]);

        assert!(!entry.is_expired());
        assert_eq!(entry.expires_at - entry.created_at, MAX_TTL);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let mut entry = entry(60, &[]);
        entry.expires_at = entry.created_at;

        assert!(entry.is_expired_at(entry.created_at), "Entry should be expired at boundary");
    }

    #[test]
    fn test_has_any_tag() {
        let entry = entry(60, &["x", "y"]);

        assert!(entry.has_any_tag(&HashSet::from(["y", "z"])));
        assert!(!entry.has_any_tag(&HashSet::from(["z"])));
        assert!(!entry.has_any_tag(&HashSet::new()));
    }

    #[test]
    fn test_overhead_counts_key_and_tags() {
        let entry = entry(60, &["ab"]);
        // "key" (3) + "ab" (2), two bytes per unit
        assert_eq!(entry.overhead(), 10);
    }

    #[test]
    fn test_estimate_size_strings() {
        assert_eq!(estimate_size("hello", true), 10);
        assert_eq!(estimate_size(&String::new(), true), 0);
        // U+1F600 is a surrogate pair in UTF-16
        assert_eq!(estimate_size("\u{1F600}", true), 4);
    }

    #[test]
    fn test_estimate_size_primitives() {
        assert_eq!(estimate_size(&42u32, true), PRIMITIVE_SIZE);
        assert_eq!(estimate_size(&1.5f64, true), PRIMITIVE_SIZE);
        assert_eq!(estimate_size(&true, true), PRIMITIVE_SIZE);
        assert_eq!(estimate_size(&Option::<u8>::None, true), PRIMITIVE_SIZE);
    }

    #[test]
    fn test_estimate_size_structured() {
        // [1,2,3] is 7 characters
        assert_eq!(estimate_size(&vec![1, 2, 3], true), 14);
        // {"a":1} is 7 characters
        assert_eq!(estimate_size(&json!({"a": 1}), true), 14);
        assert_eq!(estimate_size(&vec![1, 2, 3], false), PRIMITIVE_SIZE);
    }

    #[test]
    fn test_estimate_size_is_canonical() {
        let first = json!({"b": 2, "a": 1});
        let second = json!({"a": 1, "b": 2});
        assert_eq!(estimate_size(&first, true), estimate_size(&second, true));
    }
}
