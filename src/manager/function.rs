//! Memoized async functions.

use std::future::Future;
use std::sync::Arc;

use crate::cache::{CacheOptions, CacheValue};
use crate::manager::CacheManager;

/// An async function whose results are cached per generated key.
///
/// Built by [`CacheManager::cache_function`]. Each call derives a key from its
/// arguments and goes through [`CacheManager::cached`], so concurrent calls
/// with the same key share one invocation.
pub struct CachedFunction<V: CacheValue, F, K> {
    manager: Arc<CacheManager<V>>,
    func: F,
    key_generator: K,
    options: CacheOptions,
}

impl<V: CacheValue, F, K> CachedFunction<V, F, K> {
    pub(crate) fn new(
        manager: Arc<CacheManager<V>>,
        func: F,
        key_generator: K,
        options: CacheOptions,
    ) -> Self {
        Self {
            manager,
            func,
            key_generator,
            options,
        }
    }

    /// Returns the cached result for `args`, computing it on a miss.
    pub async fn call<A, Fut>(&self, args: A) -> V
    where
        K: Fn(&A) -> String,
        F: Fn(A) -> Fut,
        Fut: Future<Output = V>,
    {
        let key = (self.key_generator)(&args);
        self.manager
            .cached(&key, || (self.func)(args), self.options.clone())
            .await
    }
}
