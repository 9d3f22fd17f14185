//! Cache Entry Module
//!
//! A stored value with its version token and expiry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::VersionToken;

// == Cache Entry ==
/// Represents a single gateway entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored bytes
    pub value: Vec<u8>,
    /// Revision assigned on write
    pub version: VersionToken,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry. A zero `ttl` never expires.
    pub fn new(value: Vec<u8>, version: VersionToken, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let expires_at = (!ttl.is_zero()).then(|| now.saturating_add(ttl_ms));

        Self {
            value,
            version,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_zero_ttl_never_expires() {
        let entry = CacheEntry::new(b"v".to_vec(), VersionToken(1), Duration::ZERO);

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_with_ttl() {
        let entry = CacheEntry::new(b"v".to_vec(), VersionToken(7), Duration::from_secs(10));

        assert_eq!(entry.version, VersionToken(7));
        assert!(!entry.is_expired());
        let lifetime = entry.expires_at.unwrap() - entry.created_at;
        assert_eq!(lifetime, 10_000);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(b"v".to_vec(), VersionToken(1), Duration::from_millis(50));

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            value: Vec::new(),
            version: VersionToken(1),
            created_at: now,
            expires_at: Some(now),
        };

        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }

    #[test]
    fn test_oversized_ttl_saturates() {
        let entry = CacheEntry::new(Vec::new(), VersionToken(1), Duration::MAX);
        assert_eq!(entry.expires_at, Some(u64::MAX));
        assert!(!entry.is_expired());
    }
}
