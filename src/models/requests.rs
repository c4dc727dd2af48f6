//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{CacheOptions, MAX_KEY_LENGTH};
use crate::manager::WarmUpEntry;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
/// - `tags`: Optional invalidation tags
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Invalidation tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl == Some(0) {
            return Some("TTL must be greater than zero".to_string());
        }
        None
    }

    /// Cache options described by this request.
    pub fn options(&self) -> CacheOptions {
        let options = CacheOptions::new().tags(self.tags.iter().cloned());
        match self.ttl {
            Some(ttl) => options.ttl_secs(ttl),
            None => options,
        }
    }

    /// Converts the request into a warm-up batch item.
    pub fn into_warm_up_entry(self) -> WarmUpEntry<Value> {
        let options = self.options();
        WarmUpEntry::new(self.key, self.value).with_options(options)
    }
}

/// Request body for POST /invalidate/tags
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateTagsRequest {
    pub tags: Vec<String>,
}

/// Request body for POST /invalidate/pattern
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidatePatternRequest {
    /// Regular expression matched against keys
    pub pattern: String,
}

/// Request body for POST /warmup
#[derive(Debug, Clone, Deserialize)]
pub struct WarmUpRequest {
    pub entries: Vec<SetRequest>,
}
