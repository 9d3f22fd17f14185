//! Error types for the session cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the session cache.
///
/// Business-rule mismatches (stale lock ids, missing records) are not errors;
/// they are reported through the outcome enums in [`crate::session`].
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing cache could not be reached
    #[error("Cache unreachable: {0}")]
    Connectivity(String),

    /// Exclusive acquire gave up after the configured number of CAS rounds
    #[error("Lock contention on session '{session_id}' after {attempts} attempts")]
    LockContention { session_id: String, attempts: u32 },

    /// A stored blob could not be decoded
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Requested key or session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Connectivity(_) => StatusCode::BAD_GATEWAY,
            CacheError::LockContention { .. } => StatusCode::CONFLICT,
            CacheError::MalformedRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the session cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contention_message() {
        let err = CacheError::LockContention {
            session_id: "abc".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "Lock contention on session 'abc' after 3 attempts"
        );
    }

    #[test]
    fn test_status_mapping() {
        let resp = CacheError::NotFound("k".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = CacheError::Connectivity("down".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = CacheError::LockContention {
            session_id: "s".to_string(),
            attempts: 1,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
