//! Gateway Statistics Module
//!
//! Counters kept by the in-process gateway.

use serde::Serialize;

// == Gateway Stats ==
/// Operation counters for the in-process gateway.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewayStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped by LRU eviction
    pub evictions: u64,
    /// Guarded writes rejected because the version moved
    pub cas_conflicts: u64,
    /// Current number of entries
    pub total_entries: usize,
}

impl GatewayStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_cas_conflict(&mut self) {
        self.cas_conflicts += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(GatewayStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = GatewayStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_counters() {
        let mut stats = GatewayStats::new();
        stats.record_eviction();
        stats.record_cas_conflict();
        stats.record_cas_conflict();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.cas_conflicts, 2);
    }
}
