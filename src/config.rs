//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{EvictionMode, StoreConfig};

/// Server and cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Maximum estimated bytes of resident values
    pub max_memory: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Upper bound on one secondary backend call, in milliseconds
    pub secondary_timeout_ms: u64,
    /// Evict until limits hold (true) or at most once per write (false)
    pub strict_eviction: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `MAX_MEMORY` - Memory budget in bytes (default: 104857600)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 300)
    /// - `SECONDARY_TIMEOUT_MS` - Secondary backend timeout (default: 250)
    /// - `STRICT_EVICTION` - Loop eviction until limits hold (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            max_memory: env_or("MAX_MEMORY", defaults.max_memory),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            secondary_timeout_ms: env_or("SECONDARY_TIMEOUT_MS", defaults.secondary_timeout_ms),
            strict_eviction: env_or("STRICT_EVICTION", defaults.strict_eviction),
        }
    }

    /// Builds the store limits described by this configuration.
    pub fn store_config(&self) -> StoreConfig {
        let eviction_mode = if self.strict_eviction {
            EvictionMode::UntilFits
        } else {
            EvictionMode::SingleShot
        };

        StoreConfig::new(self.max_entries, self.max_memory)
            .with_default_ttl(Duration::from_secs(self.default_ttl))
            .with_eviction_mode(eviction_mode)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_memory: 100 * 1024 * 1024,
            default_ttl: 3600,
            server_port: 3000,
            cleanup_interval: 300,
            secondary_timeout_ms: 250,
            strict_eviction: true,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.max_memory, 104_857_600);
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 300);
        assert_eq!(config.secondary_timeout_ms, 250);
        assert!(config.strict_eviction);
    }

    #[test]
    fn test_env_or_falls_back_on_missing_or_invalid() {
        env::remove_var("TIERED_CACHE_TEST_UNSET");
        assert_eq!(env_or("TIERED_CACHE_TEST_UNSET", 7u64), 7);

        env::set_var("TIERED_CACHE_TEST_INVALID", "not-a-number");
        assert_eq!(env_or("TIERED_CACHE_TEST_INVALID", 7u64), 7);

        env::set_var("TIERED_CACHE_TEST_VALID", "42");
        assert_eq!(env_or("TIERED_CACHE_TEST_VALID", 7u64), 42);
    }

    #[test]
    fn test_store_config_mapping() {
        let config = Config {
            max_entries: 10,
            max_memory: 2048,
            default_ttl: 30,
            strict_eviction: false,
            ..Config::default()
        };

        let store = config.store_config();
        assert_eq!(store.max_size, 10);
        assert_eq!(store.max_memory, 2048);
        assert_eq!(store.default_ttl, Duration::from_secs(30));
        assert_eq!(store.eviction_mode, EvictionMode::SingleShot);
    }
}
