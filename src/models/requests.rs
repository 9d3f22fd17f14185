//! Request DTOs for the session cache API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use serde::Deserialize;

/// Request body for storing a cached value (PUT /cache)
#[derive(Debug, Clone, Deserialize)]
pub struct StoreRequest {
    /// Logical cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// TTL in seconds, the configured cache timeout if omitted
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl StoreRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}

/// Request body for creating an uninitialized session (POST /sessions/:id)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub timeout_minutes: u32,
}

/// Request body for committing a session (PUT /sessions/:id)
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRequest {
    /// Lock held by the caller, ignored for new items
    #[serde(default)]
    pub lock_id: u64,
    /// Session payload
    pub data: String,
    pub timeout_minutes: u32,
    #[serde(default)]
    pub new_item: bool,
}

/// Query of DELETE /sessions/:id
#[derive(Debug, Clone, Deserialize)]
pub struct LockQuery {
    pub lock_id: u64,
}
