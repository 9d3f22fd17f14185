//! Memory Gateway Module
//!
//! In-process implementation of [`CacheGateway`] with TTL expiry, LRU
//! eviction and per-write version tokens.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, CacheGateway, GatewayStats, LruTracker, VersionToken, Versioned};
use crate::error::Result;

// == Memory Gateway ==
/// A cache bucket held in process memory.
///
/// Every successful write stamps the entry with a new, non-zero version
/// token taken from a bucket-wide counter.
#[derive(Debug)]
pub struct MemoryGateway {
    /// Bucket name, for logs and stats
    name: String,
    inner: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: GatewayStats,
    max_entries: usize,
    last_version: u64,
}

impl MemoryGateway {
    // == Constructor ==
    /// Creates an empty bucket holding at most `max_entries` entries.
    pub fn new(name: impl Into<String>, max_entries: usize) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Bucket {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                stats: GatewayStats::new(),
                max_entries,
                last_version: 0,
            }),
        }
    }

    /// Bucket name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // == Stats ==
    /// Returns current statistics.
    pub fn stats(&self) -> GatewayStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.total_entries = inner.entries.len();
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.remove(key);
            inner.lru.remove(key);
        }
        expired.len()
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl Bucket {
    /// Returns the entry if present and live, dropping it if expired.
    fn live_entry(&mut self, key: &str) -> Option<&CacheEntry> {
        if self.entries.get(key).is_some_and(CacheEntry::is_expired) {
            self.entries.remove(key);
            self.lru.remove(key);
        }
        self.entries.get(key)
    }

    fn write(&mut self, key: &str, value: &[u8], ttl: Duration) -> VersionToken {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "evicted least recently used entry");
            }
        }

        self.last_version += 1;
        let version = VersionToken(self.last_version);
        self.entries
            .insert(key.to_string(), CacheEntry::new(value.to_vec(), version, ttl));
        self.lru.touch(key);
        version
    }
}

impl CacheGateway for MemoryGateway {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get_with_version(key)?.map(|found| found.value))
    }

    fn get_with_version(&self, key: &str) -> Result<Option<Versioned>> {
        let mut inner = self.inner.lock();
        let found = inner.live_entry(key).map(|entry| Versioned {
            value: entry.value.clone(),
            version: entry.version,
        });

        if found.is_some() {
            inner.stats.record_hit();
            inner.lru.touch(key);
        } else {
            inner.stats.record_miss();
        }
        Ok(found)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool> {
        self.inner.lock().write(key, value, ttl);
        Ok(true)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
        expected: VersionToken,
    ) -> Result<bool> {
        let mut inner = self.inner.lock();
        let current = inner.live_entry(key).map(|entry| entry.version);
        if current != Some(expected) {
            inner.stats.record_cas_conflict();
            debug!(key, %expected, "compare-and-swap rejected");
            return Ok(false);
        }

        inner.write(key, value, ttl);
        Ok(true)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        inner.lru.remove(key);
        Ok(inner
            .entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn test_set_and_get() {
        let gateway = MemoryGateway::new("test", 100);

        assert!(gateway.set("key1", b"value1", TTL).unwrap());
        assert_eq!(gateway.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(gateway.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let gateway = MemoryGateway::new("test", 100);
        assert_eq!(gateway.get("nonexistent").unwrap(), None);
        assert_eq!(gateway.stats().misses, 1);
    }

    #[test]
    fn test_versions_change_on_every_write() {
        let gateway = MemoryGateway::new("test", 100);

        gateway.set("key", b"a", TTL).unwrap();
        let first = gateway.get_with_version("key").unwrap().unwrap().version;
        gateway.set("key", b"b", TTL).unwrap();
        let second = gateway.get_with_version("key").unwrap().unwrap().version;

        assert_ne!(first, second);
        assert_ne!(first.get(), 0);
    }

    #[test]
    fn test_compare_and_swap_with_current_version() {
        let gateway = MemoryGateway::new("test", 100);
        gateway.set("key", b"a", TTL).unwrap();
        let version = gateway.get_with_version("key").unwrap().unwrap().version;

        assert!(gateway.compare_and_swap("key", b"b", TTL, version).unwrap());
        assert_eq!(gateway.get("key").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn test_compare_and_swap_with_stale_version() {
        let gateway = MemoryGateway::new("test", 100);
        gateway.set("key", b"a", TTL).unwrap();
        let stale = gateway.get_with_version("key").unwrap().unwrap().version;
        gateway.set("key", b"b", TTL).unwrap();

        assert!(!gateway.compare_and_swap("key", b"c", TTL, stale).unwrap());
        assert_eq!(gateway.get("key").unwrap(), Some(b"b".to_vec()));
        assert_eq!(gateway.stats().cas_conflicts, 1);
    }

    #[test]
    fn test_compare_and_swap_on_missing_key() {
        let gateway = MemoryGateway::new("test", 100);
        assert!(!gateway
            .compare_and_swap("key", b"a", TTL, VersionToken(1))
            .unwrap());
        assert!(gateway.is_empty());
    }

    #[test]
    fn test_remove() {
        let gateway = MemoryGateway::new("test", 100);
        gateway.set("key", b"a", TTL).unwrap();

        assert!(gateway.remove("key").unwrap());
        assert!(!gateway.remove("key").unwrap());
        assert_eq!(gateway.get("key").unwrap(), None);
    }

    #[test]
    fn test_ttl_expiration() {
        let gateway = MemoryGateway::new("test", 100);
        gateway.set("key", b"a", Duration::from_millis(50)).unwrap();

        assert!(gateway.get("key").unwrap().is_some());
        sleep(Duration::from_millis(80));
        assert!(gateway.get("key").unwrap().is_none());
    }

    #[test]
    fn test_zero_ttl_does_not_expire() {
        let gateway = MemoryGateway::new("test", 100);
        gateway.set("key", b"a", Duration::ZERO).unwrap();
        sleep(Duration::from_millis(20));
        assert!(gateway.get("key").unwrap().is_some());
    }

    #[test]
    fn test_huge_ttl_does_not_wrap() {
        let gateway = MemoryGateway::new("test", 100);
        // just over u64::MAX milliseconds
        gateway
            .set("far", b"a", Duration::from_secs(18_446_744_073_709_552))
            .unwrap();
        gateway.set("max", b"b", Duration::MAX).unwrap();

        sleep(Duration::from_millis(50));
        assert!(gateway.get("far").unwrap().is_some());
        assert!(gateway.get("max").unwrap().is_some());
        assert_eq!(gateway.cleanup_expired(), 0);
    }

    #[test]
    fn test_lru_eviction() {
        let gateway = MemoryGateway::new("test", 3);
        gateway.set("key1", b"1", TTL).unwrap();
        gateway.set("key2", b"2", TTL).unwrap();
        gateway.set("key3", b"3", TTL).unwrap();

        // key1 becomes most recently used, key2 is evicted instead
        gateway.get("key1").unwrap();
        gateway.set("key4", b"4", TTL).unwrap();

        assert_eq!(gateway.len(), 3);
        assert!(gateway.get("key1").unwrap().is_some());
        assert!(gateway.get("key2").unwrap().is_none());
        assert_eq!(gateway.stats().evictions, 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let gateway = MemoryGateway::new("test", 100);
        gateway.set("short", b"a", Duration::from_millis(50)).unwrap();
        gateway.set("long", b"b", TTL).unwrap();

        sleep(Duration::from_millis(80));

        assert_eq!(gateway.cleanup_expired(), 1);
        assert_eq!(gateway.len(), 1);
        assert!(gateway.get("long").unwrap().is_some());
    }
}
