//! Key Registry Module
//!
//! Process-local index of the physical keys this process has stored,
//! used to emulate prefix removal on a cache that cannot scan.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use parking_lot::Mutex;

// == Key Registry ==
/// Index of physical keys issued by the current process.
///
/// The backing cache has no prefix scan, so this registry is the only way
/// to find the members of a key group. It only knows about keys stored by
/// this process: other instances sharing the same cache keep their own
/// registries, and a group removal here will not see their keys. Entries
/// never expire, so the index may name keys the cache already evicted;
/// removing those is a harmless no-op.
///
/// Keys are grouped under their lowercased form so that a case-insensitive
/// prefix lookup is a range scan over the sorted map.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: Mutex<BTreeMap<String, BTreeSet<String>>>,
}

impl KeyRegistry {
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // == Add ==
    /// Records a physical key. Adding a known key changes nothing.
    pub fn add(&self, key: &str) {
        self.keys
            .lock()
            .entry(key.to_lowercase())
            .or_default()
            .insert(key.to_string());
    }

    // == Remove ==
    /// Forgets a physical key. Unknown keys are ignored.
    pub fn remove(&self, key: &str) {
        let folded = key.to_lowercase();
        let mut keys = self.keys.lock();
        if let Some(group) = keys.get_mut(&folded) {
            group.remove(key);
            if group.is_empty() {
                keys.remove(&folded);
            }
        }
    }

    // == Snapshot With Prefix ==
    /// Returns a copy of every key starting with `prefix`, ignoring case.
    ///
    /// The lock is held only while copying.
    pub fn snapshot_with_prefix(&self, prefix: &str) -> Vec<String> {
        let folded = prefix.to_lowercase();
        let keys = self.keys.lock();
        keys.range::<str, _>((Bound::Included(folded.as_str()), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(&folded))
            .flat_map(|(_, group)| group.iter().cloned())
            .collect()
    }

    // == Contains ==
    /// Checks whether the exact key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .get(&key.to_lowercase())
            .is_some_and(|group| group.contains(key))
    }

    // == Length ==
    /// Returns the number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.lock().values().map(BTreeSet::len).sum()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_registry_new() {
        let registry = KeyRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = KeyRegistry::new();
        registry.add("key1");
        registry.add("key1");

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("key1"));
    }

    #[test]
    fn test_remove_absent_key() {
        let registry = KeyRegistry::new();
        registry.add("key1");

        registry.remove("nonexistent");
        registry.remove("KEY1");

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("key1"));
    }

    #[test]
    fn test_remove_drops_key() {
        let registry = KeyRegistry::new();
        registry.add("key1");
        registry.remove("key1");

        assert!(registry.is_empty());
        assert!(!registry.contains("key1"));
    }

    #[test]
    fn test_snapshot_prefix_case_insensitive() {
        let registry = KeyRegistry::new();
        registry.add("User-1-Profile");
        registry.add("user-1-settings");
        registry.add("user-2-profile");
        registry.add("user-10");

        let mut snapshot = registry.snapshot_with_prefix("USER-1-");
        snapshot.sort();
        assert_eq!(snapshot, vec!["User-1-Profile", "user-1-settings"]);
    }

    #[test]
    fn test_snapshot_keeps_case_variants_apart() {
        let registry = KeyRegistry::new();
        registry.add("Alpha");
        registry.add("alpha");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.snapshot_with_prefix("al").len(), 2);

        registry.remove("Alpha");
        assert_eq!(registry.snapshot_with_prefix("al"), vec!["alpha"]);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = KeyRegistry::new();
        registry.add("a-1");
        let snapshot = registry.snapshot_with_prefix("a-");

        registry.remove("a-1");

        assert_eq!(snapshot, vec!["a-1"]);
        assert!(registry.snapshot_with_prefix("a-").is_empty());
    }

    #[test]
    fn test_empty_prefix_matches_all() {
        let registry = KeyRegistry::new();
        registry.add("x");
        registry.add("y");
        assert_eq!(registry.snapshot_with_prefix("").len(), 2);
    }

    #[test]
    fn test_concurrent_adds() {
        let registry = Arc::new(KeyRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for i in 0..100 {
                        registry.add(&format!("t{}-{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 400);
        assert_eq!(registry.snapshot_with_prefix("t2-").len(), 100);
    }
}
