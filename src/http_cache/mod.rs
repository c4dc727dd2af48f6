//! HTTP Response Cache Module
//!
//! An axum middleware that caches JSON responses of idempotent requests
//! through a [`CacheManager`](crate::manager::CacheManager).
//!
//! ```ignore
//! let state = HttpCacheState::new(manager, HttpCacheConfig::default());
//! let app = Router::new()
//!     .route("/users", get(list_users))
//!     .layer(axum::middleware::from_fn_with_state(state, http_cache_layer));
//! ```

mod middleware;
mod policy;

pub use middleware::{
    default_cache_key, http_cache_layer, HttpCacheConfig, HttpCacheState, KeyGenerator,
    RequestPredicate, X_CACHE,
};
pub use policy::{classify_response, max_age_from_headers, Cacheable, NotCacheable};
