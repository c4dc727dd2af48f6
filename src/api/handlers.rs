//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::CacheStats;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::manager::CacheManager;
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, InvalidatePatternRequest,
    InvalidateResponse, InvalidateTagsRequest, SetRequest, SetResponse, WarmUpRequest,
    WarmUpResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache manager holding JSON values
    pub cache: Arc<CacheManager<Value>>,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    pub fn new(cache: Arc<CacheManager<Value>>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The background sweep is not started; call `state.cache.start()`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(CacheManager::from_config(config)))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair in the cache with optional TTL and tags.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options();
    state.cache.set(&req.key, req.value, options).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key).await {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for POST /invalidate/tags
pub async fn invalidate_tags_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateTagsRequest>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate_by_tags(req.tags.as_slice()).await;
    Json(InvalidateResponse { removed })
}

/// Handler for POST /invalidate/pattern
///
/// Responds 400 when the pattern is not a valid regular expression.
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state.cache.invalidate_pattern_str(&req.pattern).await?;
    Ok(Json(InvalidateResponse { removed }))
}

/// Handler for POST /warmup
///
/// Entries are validated up front so a bad entry rejects the whole batch.
/// A write failure part-way through keeps the entries written before it.
pub async fn warmup_handler(
    State(state): State<AppState>,
    Json(req): Json<WarmUpRequest>,
) -> Result<Json<WarmUpResponse>> {
    if let Some(error_msg) = req.entries.iter().find_map(SetRequest::validate) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let entries = req.entries.into_iter().map(SetRequest::into_warm_up_entry);
    let warmed = state.cache.warm_up(entries).await?;

    Ok(Json(WarmUpResponse { warmed }))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::cleared())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StoreConfig;
    use serde_json::json;

    fn test_state() -> AppState {
        AppState::new(Arc::new(CacheManager::new(StoreConfig::new(100, 1024 * 1024))))
    }

    fn set_request(key: &str, value: Value, tags: &[&str]) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value,
            ttl: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = set_request("test_key", json!({"answer": 42}), &[]);
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let result = get_handler(State(state.clone()), Path("test_key".to_string())).await;
        let response = result.unwrap();
        assert_eq!(response.value, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();

        let req = set_request("to_delete", json!("value"), &[]);
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = get_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_err());

        let result = delete_handler(State(state), Path("to_delete".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.total_keys, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let req = set_request("", json!("value"), &[]);
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_tags_handler() {
        let state = test_state();
        for (key, tags) in [("a", ["users"]), ("b", ["posts"]), ("c", ["users"])] {
            let req = set_request(key, json!(key), &tags);
            set_handler(State(state.clone()), Json(req)).await.unwrap();
        }

        let req = InvalidateTagsRequest {
            tags: vec!["users".to_string()],
        };
        let response = invalidate_tags_handler(State(state.clone()), Json(req)).await;
        assert_eq!(response.removed, 2);
        assert!(state.cache.has("b").await);
    }

    #[tokio::test]
    async fn test_invalidate_pattern_handler() {
        let state = test_state();
        for key in ["user:1", "user:2", "post:1"] {
            let req = set_request(key, json!(1), &[]);
            set_handler(State(state.clone()), Json(req)).await.unwrap();
        }

        let req = InvalidatePatternRequest {
            pattern: "^user:".to_string(),
        };
        let response = invalidate_pattern_handler(State(state.clone()), Json(req))
            .await
            .unwrap();
        assert_eq!(response.removed, 2);

        let req = InvalidatePatternRequest {
            pattern: "(".to_string(),
        };
        let result = invalidate_pattern_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn test_warmup_handler() {
        let state = test_state();

        let req = WarmUpRequest {
            entries: vec![
                set_request("k1", json!("v1"), &[]),
                set_request("k2", json!("v2"), &[]),
            ],
        };
        let response = warmup_handler(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(response.warmed, 2);

        let stats = state.cache.stats().await;
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.total_keys, 2);
    }

    #[tokio::test]
    async fn test_warmup_rejects_invalid_entry() {
        let state = test_state();

        let req = WarmUpRequest {
            entries: vec![set_request("ok", json!(1), &[]), set_request("", json!(2), &[])],
        };
        let result = warmup_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_err());
        assert!(!state.cache.has("ok").await);
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state();
        let req = set_request("k", json!(1), &[]);
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        clear_handler(State(state.clone())).await;
        assert_eq!(state.cache.stats().await.total_keys, 0);
    }
}
