//! Cache Facade Module
//!
//! Generic get/store/remove operations with group removal by key prefix.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{encode_key, CacheGateway, KeyRegistry};
use crate::error::{CacheError, Result};

// == Cache Facade ==
/// Caller-facing cache API.
///
/// Logical keys are encoded with [`encode_key`] before they reach the
/// gateway, and every physical key written is recorded in a
/// [`KeyRegistry`] so [`CacheFacade::remove_all`] can find it again.
/// Group removal therefore only covers keys stored through this facade
/// instance, in this process.
pub struct CacheFacade {
    gateway: Arc<dyn CacheGateway>,
    registry: KeyRegistry,
}

impl CacheFacade {
    // == Constructor ==
    pub fn new(gateway: Arc<dyn CacheGateway>) -> Self {
        Self {
            gateway,
            registry: KeyRegistry::new(),
        }
    }

    /// Keys stored by this facade.
    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    // == Store ==
    /// Stores a value for `ttl`.
    ///
    /// A zero `ttl` or a missing value stores nothing and registers nothing.
    /// Returns whether a write happened.
    pub fn store(&self, key: &str, value: Option<&[u8]>, ttl: Duration) -> Result<bool> {
        let Some(value) = value else {
            return Ok(false);
        };
        if ttl.is_zero() {
            return Ok(false);
        }

        let physical = encode_key(key);
        self.gateway.set(&physical, value, ttl)?;
        self.registry.add(&physical);
        debug!(key = %physical, ttl_secs = ttl.as_secs(), "stored cache entry");
        Ok(true)
    }

    /// Stores a serializable value as JSON. Same rules as [`CacheFacade::store`].
    pub fn store_as<T: Serialize>(&self, key: &str, value: Option<&T>, ttl: Duration) -> Result<bool> {
        let bytes = value
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| CacheError::InvalidRequest(format!("Unserializable value: {}", e)))?;
        self.store(key, bytes.as_deref(), ttl)
    }

    // == Get ==
    /// Reads a value. A miss is `None`.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gateway.get(&encode_key(key))
    }

    /// Reads a JSON value. A miss or a value of another shape is `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Ok(self
            .get(key)?
            .and_then(|bytes| serde_json::from_slice(&bytes).ok()))
    }

    // == Remove ==
    /// Removes a value and forgets its key. Returns whether the cache held it.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let physical = encode_key(key);
        let removed = self.gateway.remove(&physical)?;
        self.registry.remove(&physical);
        Ok(removed)
    }

    // == Remove All ==
    /// Removes every registered key starting with `prefix`, ignoring case.
    ///
    /// Works on a snapshot: a matching key stored while this runs may or
    /// may not be removed. Returns the number of keys processed.
    pub fn remove_all(&self, prefix: &str) -> Result<usize> {
        let snapshot = self.registry.snapshot_with_prefix(&encode_key(prefix));
        for key in &snapshot {
            self.gateway.remove(key)?;
            self.registry.remove(key);
        }

        info!(prefix, removed = snapshot.len(), "removed cache key group");
        Ok(snapshot.len())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryGateway, CACHE_KEY_MAX_LEN};
    use serde::Deserialize;

    const TTL: Duration = Duration::from_secs(60);

    fn facade() -> CacheFacade {
        CacheFacade::new(Arc::new(MemoryGateway::new("test", 1000)))
    }

    #[test]
    fn test_store_then_get() {
        let cache = facade();
        assert!(cache.store("key", Some(b"value"), TTL).unwrap());
        assert_eq!(cache.get("key").unwrap(), Some(b"value".to_vec()));
        assert!(cache.registry().contains("key"));
    }

    #[test]
    fn test_store_zero_ttl_is_noop() {
        let cache = facade();
        assert!(!cache.store("key", Some(b"value"), Duration::ZERO).unwrap());
        assert_eq!(cache.get("key").unwrap(), None);
        assert!(cache.registry().is_empty());
    }

    #[test]
    fn test_store_absent_value_is_noop() {
        let cache = facade();
        assert!(!cache.store("key", None, TTL).unwrap());
        assert!(cache.registry().is_empty());
    }

    #[test]
    fn test_store_registers_physical_key() {
        let cache = facade();
        cache.store("with space", Some(b"v"), TTL).unwrap();

        assert!(cache.registry().contains("with0space"));
        assert_eq!(cache.get("with space").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_remove() {
        let cache = facade();
        cache.store("key", Some(b"value"), TTL).unwrap();

        assert!(cache.remove("key").unwrap());
        assert_eq!(cache.get("key").unwrap(), None);
        assert!(cache.registry().is_empty());
        assert!(!cache.remove("key").unwrap());
    }

    #[test]
    fn test_remove_all_by_prefix() {
        let cache = facade();
        cache.store("user-1-profile", Some(b"A"), TTL).unwrap();
        cache.store("user-1-settings", Some(b"B"), TTL).unwrap();
        cache.store("user-2-profile", Some(b"C"), TTL).unwrap();

        assert_eq!(cache.remove_all("user-1").unwrap(), 2);

        assert_eq!(cache.get("user-1-profile").unwrap(), None);
        assert_eq!(cache.get("user-1-settings").unwrap(), None);
        assert_eq!(cache.get("user-2-profile").unwrap(), Some(b"C".to_vec()));
        assert_eq!(cache.registry().len(), 1);
    }

    #[test]
    fn test_remove_all_ignores_case() {
        let cache = facade();
        cache.store("Menu-Main", Some(b"A"), TTL).unwrap();
        cache.store("menu-footer", Some(b"B"), TTL).unwrap();

        assert_eq!(cache.remove_all("MENU-").unwrap(), 2);
        assert_eq!(cache.get("Menu-Main").unwrap(), None);
    }

    #[test]
    fn test_remove_all_covers_overlong_keys() {
        let cache = facade();
        let long = format!("grp-{}", "x".repeat(CACHE_KEY_MAX_LEN));
        cache.store(&long, Some(b"A"), TTL).unwrap();

        assert_eq!(cache.remove_all("grp-").unwrap(), 1);
        assert_eq!(cache.get(&long).unwrap(), None);
    }

    #[test]
    fn test_remove_all_with_stale_registry_entry() {
        let gateway = Arc::new(MemoryGateway::new("test", 1000));
        let cache = CacheFacade::new(gateway.clone());
        cache.store("old-1", Some(b"A"), TTL).unwrap();

        // expired or evicted behind the registry's back
        gateway.remove("old-1").unwrap();

        assert_eq!(cache.remove_all("old-").unwrap(), 1);
        assert!(cache.registry().is_empty());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[test]
    fn test_typed_round_trip() {
        let cache = facade();
        let profile = Profile {
            name: "ada".to_string(),
            visits: 3,
        };
        cache.store_as("profile", Some(&profile), TTL).unwrap();

        assert_eq!(cache.get_as::<Profile>("profile").unwrap(), Some(profile));
    }

    #[test]
    fn test_typed_get_mismatch_is_absent() {
        let cache = facade();
        cache.store("profile", Some(b"not json"), TTL).unwrap();
        assert_eq!(cache.get_as::<Profile>("profile").unwrap(), None);

        cache.store_as("count", Some(&5u32), TTL).unwrap();
        assert_eq!(cache.get_as::<Profile>("count").unwrap(), None);
    }
}
