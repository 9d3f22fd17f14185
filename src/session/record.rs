//! Session Record Module
//!
//! A session is persisted as two cache entries: a small header carrying the
//! lock and timeout metadata, and a data entry carrying the payload. Each is
//! versioned on its own so lock changes never rewrite the payload.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::VersionToken;
use crate::error::{CacheError, Result};

/// Layout tag written first in every header blob.
pub const HEADER_FORMAT_VERSION: u8 = 1;

// == Session Flag ==
/// Pending action recorded on a session header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFlag {
    #[default]
    None,
    /// Created empty and not yet initialized by its first request
    InitializeItem,
    Abandoned,
}

impl SessionFlag {
    fn to_byte(self) -> u8 {
        match self {
            SessionFlag::None => 0,
            SessionFlag::InitializeItem => 1,
            SessionFlag::Abandoned => 2,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(SessionFlag::None),
            1 => Some(SessionFlag::InitializeItem),
            2 => Some(SessionFlag::Abandoned),
            _ => None,
        }
    }
}

// == Lock Id ==
/// Token marking a session as exclusively held. Zero means unlocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(pub u64);

impl LockId {
    pub const NONE: LockId = LockId(0);

    /// Derives a lock id from the header revision it was taken against.
    pub fn from_version(version: VersionToken) -> Self {
        LockId(version.get().max(1))
    }

    pub fn is_locked(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// == Lock Info ==
/// Who holds a session and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInfo {
    pub lock_id: LockId,
    pub lock_age: chrono::Duration,
}

// == Session Header ==
/// Lock, flag and timeout metadata of one session.
///
/// `lock_time` only means something while `lock_id` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHeader {
    pub flag: SessionFlag,
    pub timeout_minutes: u32,
    pub lock_id: LockId,
    pub lock_time: DateTime<Utc>,
}

type HeaderLayout = (u8, u8, u32, u64, i64);

impl SessionHeader {
    /// An unlocked header with no pending action.
    pub fn unlocked(timeout_minutes: u32) -> Self {
        Self {
            flag: SessionFlag::None,
            timeout_minutes,
            lock_id: LockId::NONE,
            lock_time: DateTime::UNIX_EPOCH,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_id.is_locked()
    }

    /// Lock holder and age at `now`, if locked.
    pub fn lock_info(&self, now: DateTime<Utc>) -> Option<LockInfo> {
        self.is_locked().then(|| LockInfo {
            lock_id: self.lock_id,
            lock_age: now - self.lock_time,
        })
    }

    /// Clears the lock.
    pub fn release(&mut self) {
        self.lock_id = LockId::NONE;
        self.lock_time = DateTime::UNIX_EPOCH;
    }

    /// Cache TTL of both session entries.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_minutes) * 60)
    }

    // == Encode ==
    /// Positional encoding: `[format, flag, timeout, lock_id, lock_time_ms]`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let layout: HeaderLayout = (
            HEADER_FORMAT_VERSION,
            self.flag.to_byte(),
            self.timeout_minutes,
            self.lock_id.0,
            self.lock_time.timestamp_millis(),
        );
        serde_json::to_vec(&layout)
            .map_err(|e| CacheError::Internal(format!("Failed to encode session header: {}", e)))
    }

    // == Decode ==
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (format, flag, timeout_minutes, lock_id, lock_ms): HeaderLayout =
            serde_json::from_slice(bytes).map_err(|e| CacheError::MalformedRecord(e.to_string()))?;

        if format != HEADER_FORMAT_VERSION {
            return Err(CacheError::MalformedRecord(format!(
                "Unknown header format {}",
                format
            )));
        }
        let flag = SessionFlag::from_byte(flag)
            .ok_or_else(|| CacheError::MalformedRecord(format!("Unknown session flag {}", flag)))?;
        let lock_time = DateTime::from_timestamp_millis(lock_ms)
            .ok_or_else(|| CacheError::MalformedRecord(format!("Lock time out of range: {}", lock_ms)))?;

        Ok(Self {
            flag,
            timeout_minutes,
            lock_id: LockId(lock_id),
            lock_time,
        })
    }
}

// == Session State ==
/// What callers read and commit: the opaque payload and its timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub items: Vec<u8>,
    pub timeout_minutes: u32,
}

impl SessionState {
    /// Fresh, empty state.
    pub fn new(timeout_minutes: u32) -> Self {
        Self {
            items: Vec::new(),
            timeout_minutes,
        }
    }
}

// == Session Record ==
/// A fully loaded session: header and data, each with the version it was
/// read at.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub header: SessionHeader,
    pub header_version: VersionToken,
    pub items: Vec<u8>,
    pub data_version: VersionToken,
}

impl SessionRecord {
    pub fn state(&self) -> SessionState {
        SessionState {
            items: self.items.clone(),
            timeout_minutes: self.header.timeout_minutes,
        }
    }
}

// == Session Keys ==
/// Naming scheme for the two entries of a session.
///
/// Header: `<site>+<app-path>info-<id>`, data: `<site>+<app-path>data-<id>`.
/// Spaces in the site name become dashes.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    header_prefix: String,
    data_prefix: String,
}

impl SessionKeys {
    pub fn new(site_name: &str, app_path: &str) -> Self {
        let base = format!("{}+{}", site_name.replace(' ', "-"), app_path);
        Self {
            header_prefix: format!("{}info-", base),
            data_prefix: format!("{}data-", base),
        }
    }

    pub fn header_key(&self, id: &str) -> String {
        format!("{}{}", self.header_prefix, id)
    }

    pub fn data_key(&self, id: &str) -> String {
        format!("{}{}", self.data_prefix, id)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn locked_header() -> SessionHeader {
        SessionHeader {
            flag: SessionFlag::InitializeItem,
            timeout_minutes: 20,
            lock_id: LockId(42),
            lock_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_header_encoding_is_positional() {
        let bytes = locked_header().encode().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("[1,1,20,42,"));
    }

    #[test]
    fn test_header_decodes_what_it_encodes() {
        let header = locked_header();
        let decoded = SessionHeader::decode(&header.encode().unwrap()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        let result = SessionHeader::decode(b"[2,0,20,0,0]");
        assert!(matches!(result, Err(CacheError::MalformedRecord(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_flag() {
        let result = SessionHeader::decode(b"[1,9,20,0,0]");
        assert!(matches!(result, Err(CacheError::MalformedRecord(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = SessionHeader::decode(b"\x00\x01garbage");
        assert!(matches!(result, Err(CacheError::MalformedRecord(_))));
    }

    #[test]
    fn test_unlocked_header() {
        let header = SessionHeader::unlocked(20);
        assert!(!header.is_locked());
        assert_eq!(header.lock_time, DateTime::UNIX_EPOCH);
        assert!(header.lock_info(Utc::now()).is_none());
        assert_eq!(header.ttl(), Duration::from_secs(1200));
    }

    #[test]
    fn test_lock_info_age() {
        let header = locked_header();
        let now = header.lock_time + chrono::Duration::seconds(90);
        let info = header.lock_info(now).unwrap();
        assert_eq!(info.lock_id, LockId(42));
        assert_eq!(info.lock_age, chrono::Duration::seconds(90));
    }

    #[test]
    fn test_release_clears_lock() {
        let mut header = locked_header();
        header.release();
        assert!(!header.is_locked());
        assert_eq!(header.lock_time, DateTime::UNIX_EPOCH);
        assert_eq!(header.flag, SessionFlag::InitializeItem);
    }

    #[test]
    fn test_lock_id_from_version_is_never_zero() {
        assert_eq!(LockId::from_version(VersionToken(0)), LockId(1));
        assert_eq!(LockId::from_version(VersionToken(17)), LockId(17));
    }

    #[test]
    fn test_session_keys() {
        let keys = SessionKeys::new("Default Web Site", "/shop/");
        assert_eq!(keys.header_key("abc"), "Default-Web-Site+/shop/info-abc");
        assert_eq!(keys.data_key("abc"), "Default-Web-Site+/shop/data-abc");
    }
}
