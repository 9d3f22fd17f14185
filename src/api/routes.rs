//! API Routes
//!
//! Configures the Axum router with all session cache endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    commit_session_handler, create_session_handler, get_value_handler, health_handler,
    lock_session_handler, read_session_handler, release_session_handler, remove_prefix_handler,
    remove_session_handler, remove_value_handler, repair_session_handler, stats_handler,
    store_handler, touch_session_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a value under a logical key
/// - `GET /cache/:key` - Read a cached value
/// - `DELETE /cache/:key` - Remove a cached value
/// - `DELETE /cache/prefix/:prefix` - Remove every registered key under a prefix
/// - `POST /sessions/:id` - Create an uninitialized session
/// - `GET /sessions/:id` - Shared (non-locking) read
/// - `PUT /sessions/:id` - Commit data and release the lock
/// - `DELETE /sessions/:id?lock_id=` - Remove a session under its lock
/// - `POST /sessions/:id/lock` - Exclusive acquire
/// - `DELETE /sessions/:id/lock/:lock_id` - Release without writing
/// - `POST /sessions/:id/touch` - Refresh expiry
/// - `POST /sessions/:id/repair` - Reconcile header and data entries
/// - `GET /stats` - Gateway statistics
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", put(store_handler))
        .route(
            "/cache/:key",
            get(get_value_handler).delete(remove_value_handler),
        )
        .route("/cache/prefix/:prefix", delete(remove_prefix_handler))
        .route(
            "/sessions/:id",
            post(create_session_handler)
                .get(read_session_handler)
                .put(commit_session_handler)
                .delete(remove_session_handler),
        )
        .route("/sessions/:id/lock", post(lock_session_handler))
        .route("/sessions/:id/lock/:lock_id", delete(release_session_handler))
        .route("/sessions/:id/touch", post(touch_session_handler))
        .route("/sessions/:id/repair", post(repair_session_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
