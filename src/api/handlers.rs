//! API Handlers
//!
//! HTTP request handlers for the cache facade and the session store.
//!
//! Store calls are blocking round trips (an exclusive acquire may also
//! sleep between CAS rounds), so they run on the blocking thread pool.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::cache::{CacheFacade, CacheGateway, MemoryGateway};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CommitRequest, CreateSessionRequest, HealthResponse, LockQuery, OutcomeResponse,
    RemoveAllResponse, RemoveResponse, SessionResponse, StatsResponse, StoreRequest, StoreResponse,
    ValueResponse,
};
use crate::session::{
    CommitOutcome, LockId, ReleaseOutcome, RemoveOutcome, RepairOutcome, SessionKeys,
    SessionStore, TouchOutcome,
};

/// Application state shared across all handlers.
///
/// The gateway is built once at startup and shared by the facade and the
/// session store.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<MemoryGateway>,
    pub cache: Arc<CacheFacade>,
    pub sessions: Arc<SessionStore>,
    /// TTL for stores that do not name one
    pub cache_ttl: Duration,
}

impl AppState {
    /// Wires the facade and the session store to `gateway`.
    pub fn new(gateway: Arc<MemoryGateway>, config: &Config) -> Self {
        let shared: Arc<dyn CacheGateway> = gateway.clone();
        let keys = SessionKeys::new(&config.site_name, &config.app_path);
        Self {
            cache: Arc::new(CacheFacade::new(shared.clone())),
            sessions: Arc::new(SessionStore::new(shared, keys, config.retry_policy())),
            gateway,
            cache_ttl: config.cache_ttl(),
        }
    }

    /// Creates the gateway and all stores from configuration.
    pub fn from_config(config: &Config) -> Self {
        let gateway = Arc::new(MemoryGateway::new(config.cache_name.clone(), config.max_entries));
        Self::new(gateway, config)
    }
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CacheError::Internal(format!("Blocking task failed: {}", e)))?
}

// == Cache Handlers ==

/// Handler for PUT /cache
pub async fn store_handler(
    State(state): State<AppState>,
    Json(req): Json<StoreRequest>,
) -> Result<Json<StoreResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl.map(Duration::from_secs).unwrap_or(state.cache_ttl);
    let cache = state.cache.clone();
    let key = req.key.clone();
    let stored = blocking(move || cache.store(&key, Some(req.value.as_bytes()), ttl)).await?;

    Ok(Json(StoreResponse {
        key: req.key,
        stored,
    }))
}

/// Handler for GET /cache/:key
pub async fn get_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ValueResponse>> {
    let cache = state.cache.clone();
    let lookup = key.clone();
    match blocking(move || cache.get(&lookup)).await? {
        Some(value) => Ok(Json(ValueResponse::new(key, &value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
pub async fn remove_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemoveResponse>> {
    let cache = state.cache.clone();
    let target = key.clone();
    let removed = blocking(move || cache.remove(&target)).await?;

    Ok(Json(RemoveResponse { key, removed }))
}

/// Handler for DELETE /cache/prefix/:prefix
pub async fn remove_prefix_handler(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<RemoveAllResponse>> {
    let cache = state.cache.clone();
    let group = prefix.clone();
    let removed = blocking(move || cache.remove_all(&group)).await?;

    Ok(Json(RemoveAllResponse { prefix, removed }))
}

// == Session Handlers ==

/// Handler for POST /sessions/:id
pub async fn create_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<OutcomeResponse<&'static str>>)> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    blocking(move || sessions.create_uninitialized(&session_id, req.timeout_minutes)).await?;

    Ok((StatusCode::CREATED, Json(OutcomeResponse::new(id, "created"))))
}

/// Handler for GET /sessions/:id
pub async fn read_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    let read = blocking(move || sessions.acquire_shared(&session_id)).await?;

    SessionResponse::from_shared(&id, &read)
        .map(Json)
        .ok_or(CacheError::NotFound(id))
}

/// Handler for POST /sessions/:id/lock
pub async fn lock_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    let acquire = blocking(move || sessions.acquire_exclusive(&session_id)).await?;

    SessionResponse::from_exclusive(&id, &acquire)
        .map(Json)
        .ok_or(CacheError::NotFound(id))
}

/// Handler for DELETE /sessions/:id/lock/:lock_id
pub async fn release_session_handler(
    State(state): State<AppState>,
    Path((id, lock_id)): Path<(String, u64)>,
) -> Result<Json<OutcomeResponse<ReleaseOutcome>>> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    let outcome = blocking(move || sessions.release(&session_id, LockId(lock_id))).await?;

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

/// Handler for PUT /sessions/:id
pub async fn commit_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommitRequest>,
) -> Result<Json<OutcomeResponse<CommitOutcome>>> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    let outcome = blocking(move || {
        sessions.commit_and_release(
            &session_id,
            LockId(req.lock_id),
            req.data.as_bytes(),
            req.timeout_minutes,
            req.new_item,
        )
    })
    .await?;

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

/// Handler for DELETE /sessions/:id?lock_id=
pub async fn remove_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LockQuery>,
) -> Result<Json<OutcomeResponse<RemoveOutcome>>> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    let outcome = blocking(move || sessions.remove(&session_id, LockId(query.lock_id))).await?;

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

/// Handler for POST /sessions/:id/touch
pub async fn touch_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OutcomeResponse<TouchOutcome>>> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    let outcome = blocking(move || sessions.touch(&session_id)).await?;

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

/// Handler for POST /sessions/:id/repair
pub async fn repair_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OutcomeResponse<RepairOutcome>>> {
    let sessions = state.sessions.clone();
    let session_id = id.clone();
    let outcome = blocking(move || sessions.repair(&session_id)).await?;

    Ok(Json(OutcomeResponse::new(id, outcome)))
}

// == Service Handlers ==

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.gateway.stats();
    Json(StatsResponse::new(
        state.gateway.name(),
        &stats,
        state.cache.registry().len(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
