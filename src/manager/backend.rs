//! Secondary backend interface.
//!
//! A secondary store sits behind the in-memory one: misses fall through to it
//! and writes are mirrored to it. Only the no-op implementation ships here.

use async_trait::async_trait;

use crate::cache::CacheOptions;
use crate::error::Result;

/// Store consulted after a primary miss.
///
/// Errors returned here never reach cache callers; the manager logs them and
/// treats the call as a miss.
#[async_trait]
pub trait SecondaryBackend<V>: Send + Sync
where
    V: Send + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>>;

    async fn set(&self, key: &str, value: V, options: &CacheOptions) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    async fn clear(&self) -> Result<()>;
}

/// Backend that stores nothing and always misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

#[async_trait]
impl<V> SecondaryBackend<V> for NoopBackend
where
    V: Send + 'static,
{
    async fn get(&self, _key: &str) -> Result<Option<V>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: V, _options: &CacheOptions) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
