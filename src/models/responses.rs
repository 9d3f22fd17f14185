//! Response DTOs for the session cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::GatewayStats;
use crate::session::{ExclusiveAcquire, LockInfo, SessionFlag, SessionState, SharedRead};

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct ValueResponse {
    pub key: String,
    pub value: String,
}

impl ValueResponse {
    /// Non-UTF-8 bytes are replaced, the API only speaks text.
    pub fn new(key: impl Into<String>, value: &[u8]) -> Self {
        Self {
            key: key.into(),
            value: String::from_utf8_lossy(value).into_owned(),
        }
    }
}

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    pub key: String,
    /// False when the TTL was zero and nothing was written
    pub stored: bool,
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct RemoveResponse {
    pub key: String,
    pub removed: bool,
}

/// Response body for DELETE /cache/prefix/:prefix
#[derive(Debug, Clone, Serialize)]
pub struct RemoveAllResponse {
    pub prefix: String,
    pub removed: usize,
}

/// A session as seen by a shared read or an exclusive acquire.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub locked: bool,
    pub acquired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_age_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<SessionFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,
}

impl SessionResponse {
    fn empty(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            locked: false,
            acquired: false,
            lock_id: None,
            lock_age_ms: None,
            actions: None,
            data: None,
            timeout_minutes: None,
        }
    }

    fn with_lock(mut self, lock: LockInfo) -> Self {
        self.locked = true;
        self.lock_id = Some(lock.lock_id.0);
        self.lock_age_ms = Some(lock.lock_age.num_milliseconds());
        self
    }

    fn with_state(mut self, state: &SessionState) -> Self {
        self.data = Some(String::from_utf8_lossy(&state.items).into_owned());
        self.timeout_minutes = Some(state.timeout_minutes);
        self
    }

    /// None when the session does not exist.
    pub fn from_shared(session_id: &str, read: &SharedRead) -> Option<Self> {
        match read {
            SharedRead::NotFound => None,
            SharedRead::Found { state, lock } => {
                let response = Self::empty(session_id).with_state(state);
                Some(match lock {
                    Some(lock) => response.with_lock(*lock),
                    None => response,
                })
            }
        }
    }

    /// None when the session does not exist.
    pub fn from_exclusive(session_id: &str, acquire: &ExclusiveAcquire) -> Option<Self> {
        match acquire {
            ExclusiveAcquire::NotFound => None,
            ExclusiveAcquire::Held(lock) => Some(Self::empty(session_id).with_lock(*lock)),
            ExclusiveAcquire::Acquired {
                lock_id,
                actions,
                state,
            } => {
                let mut response = Self::empty(session_id).with_state(state);
                response.locked = true;
                response.acquired = true;
                response.lock_id = Some(lock_id.0);
                response.lock_age_ms = Some(0);
                response.actions = Some(*actions);
                Some(response)
            }
        }
    }
}

/// Tagged outcome of a session mutation.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeResponse<T: Serialize> {
    pub session_id: String,
    pub outcome: T,
}

impl<T: Serialize> OutcomeResponse<T> {
    pub fn new(session_id: impl Into<String>, outcome: T) -> Self {
        Self {
            session_id: session_id.into(),
            outcome,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub bucket: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub cas_conflicts: u64,
    pub total_entries: usize,
    pub hit_rate: f64,
    /// Keys known to this process's registry
    pub registered_keys: usize,
}

impl StatsResponse {
    pub fn new(bucket: impl Into<String>, stats: &GatewayStats, registered_keys: usize) -> Self {
        Self {
            bucket: bucket.into(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            cas_conflicts: stats.cas_conflicts,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            registered_keys,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
