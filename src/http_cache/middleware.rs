//! Response cache middleware.
//!
//! Serves cached JSON bodies for matching requests and stores cacheable
//! responses on a miss.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::policy::classify_response;
use crate::cache::CacheOptions;
use crate::error::CacheError;
use crate::manager::CacheManager;

/// Header reporting whether a response came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Decides whether a request goes through the cache.
pub type RequestPredicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Derives the cache key of a request.
pub type KeyGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

// == Config ==
/// Settings for [`http_cache_layer`].
#[derive(Clone)]
pub struct HttpCacheConfig {
    /// TTL used when the response carries no `max-age`
    pub default_ttl: Duration,
    /// Tags attached to every stored response
    pub tags: Vec<String>,
    /// Responses with a larger (or unknown) body size are passed through
    pub max_body_bytes: usize,
    should_cache: RequestPredicate,
    key_generator: KeyGenerator,
}

impl Default for HttpCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            tags: Vec::new(),
            max_body_bytes: 1024 * 1024,
            should_cache: Arc::new(|request: &Request| request.method() == Method::GET),
            key_generator: Arc::new(default_cache_key),
        }
    }
}

impl fmt::Debug for HttpCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCacheConfig")
            .field("default_ttl", &self.default_ttl)
            .field("tags", &self.tags)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl HttpCacheConfig {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Replaces the default GET-only predicate.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.should_cache = Arc::new(predicate);
        self
    }

    /// Replaces the default method + path + query key.
    pub fn with_key_generator<F>(mut self, key_generator: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(key_generator);
        self
    }
}

/// Builds `"{METHOD}:{path}"` plus `"?{query}"` when a query is present.
pub fn default_cache_key(request: &Request) -> String {
    let uri = request.uri();
    match uri.query() {
        Some(query) => format!("{}:{}?{}", request.method(), uri.path(), query),
        None => format!("{}:{}", request.method(), uri.path()),
    }
}

// == State ==
/// Shared state for [`http_cache_layer`].
#[derive(Clone)]
pub struct HttpCacheState {
    pub cache: Arc<CacheManager<Value>>,
    pub config: Arc<HttpCacheConfig>,
}

impl HttpCacheState {
    pub fn new(cache: Arc<CacheManager<Value>>, config: HttpCacheConfig) -> Self {
        Self {
            cache,
            config: Arc::new(config),
        }
    }
}

// == Middleware ==
/// Middleware caching JSON responses of matching requests.
///
/// A hit short-circuits with the cached body and `X-Cache: HIT`. On a miss
/// the handler runs; a cacheable response is stored and tagged
/// `X-Cache: MISS`, anything else is returned untouched.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn http_cache_layer(
    State(state): State<HttpCacheState>,
    request: Request,
    next: Next,
) -> Response {
    if !(state.config.should_cache)(&request) {
        return next.run(request).await;
    }

    let key = (state.config.key_generator)(&request);

    if let Some(body) = state.cache.get(&key).await {
        debug!(cache = "http", outcome = "hit", %key, "serving cached response");
        return (StatusCode::OK, [(X_CACHE, HeaderValue::from_static("HIT"))], Json(body))
            .into_response();
    }

    debug!(cache = "http", outcome = "miss", %key, "cache miss, executing handler");
    let response = next.run(request).await;

    let fits = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= state.config.max_body_bytes as u64);
    if !fits {
        debug!(cache = "http", %key, "response body too large or unbounded, not caching");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(
                cache = "http",
                %key,
                status = %parts.status,
                error = %err,
                "failed to collect response body"
            );
            return body_error_response(&err);
        }
    };

    match classify_response(parts.status, &parts.headers, &bytes, state.config.default_ttl) {
        Ok(cacheable) => {
            let options = CacheOptions::new()
                .ttl(cacheable.ttl)
                .tags(state.config.tags.iter().cloned());
            match state.cache.set(&key, cacheable.body, options).await {
                Ok(()) => {
                    parts
                        .headers
                        .insert(X_CACHE, HeaderValue::from_static("MISS"));
                }
                Err(err) => warn!(cache = "http", %key, error = %err, "response not cached"),
            }
        }
        Err(reason) => debug!(cache = "http", %key, ?reason, "response not cacheable"),
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Response sent when the handler's body cannot be read back.
///
/// The body is already consumed, so the handler's response is lost; the error
/// uses the same JSON shape as [`CacheError`].
fn body_error_response(err: &axum::Error) -> Response {
    CacheError::Internal(format!("failed to read response body: {}", err)).into_response()
}
