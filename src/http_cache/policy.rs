//! Cacheability rules for HTTP responses.

use std::time::Duration;

use axum::http::{header::CACHE_CONTROL, HeaderMap, StatusCode};
use serde_json::Value;

/// A response body that may be stored, with the TTL to store it for.
#[derive(Debug, Clone, PartialEq)]
pub struct Cacheable {
    pub body: Value,
    pub ttl: Duration,
}

/// Why a response was passed through without being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotCacheable {
    /// Status outside 2xx
    Status(StatusCode),
    /// `Cache-Control: no-store` or `private`
    NoStore,
    /// `Cache-Control: max-age=0`
    ZeroMaxAge,
    /// Body is not valid JSON
    NotJson,
}

/// Decides whether a response can be cached.
///
/// Cacheable responses are 2xx with a JSON body. The TTL comes from
/// `Cache-Control: max-age=N` when present, `default_ttl` otherwise.
pub fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    default_ttl: Duration,
) -> Result<Cacheable, NotCacheable> {
    if !status.is_success() {
        return Err(NotCacheable::Status(status));
    }

    let directives = cache_control_directives(headers);
    if directives
        .iter()
        .any(|directive| directive == "no-store" || directive == "private")
    {
        return Err(NotCacheable::NoStore);
    }

    let ttl = max_age(&directives).unwrap_or(default_ttl);
    if ttl.is_zero() {
        return Err(NotCacheable::ZeroMaxAge);
    }

    let body = serde_json::from_slice(body).map_err(|_| NotCacheable::NotJson)?;
    Ok(Cacheable { body, ttl })
}

/// Returns `max-age` from a response's `Cache-Control` headers, if any.
pub fn max_age_from_headers(headers: &HeaderMap) -> Option<Duration> {
    max_age(&cache_control_directives(headers))
}

fn cache_control_directives(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|directive| directive.trim().to_ascii_lowercase())
        .filter(|directive| !directive.is_empty())
        .collect()
}

fn max_age(directives: &[String]) -> Option<Duration> {
    directives.iter().find_map(|directive| {
        directive
            .strip_prefix("max-age=")?
            .trim_matches('"')
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    })
}
