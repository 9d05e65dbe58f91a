//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, loads, and evictions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of lookups answered from the cache
    pub hits: u64,
    /// Number of lookups that found no entry (including coalesced waiters)
    pub misses: u64,
    /// Number of loader invocations that produced a value
    pub load_successes: u64,
    /// Number of loader invocations that failed
    pub load_failures: u64,
    /// Number of entries evicted to satisfy capacity
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Load Count ==
    /// Total number of loader invocations, successful or not.
    pub fn load_count(&self) -> u64 {
        self.load_successes + self.load_failures
    }
}

// == Stats Counter ==
/// Atomic counters shared by every clone of a cache.
///
/// Updated from the read path too, so counters live outside the cache lock.
#[derive(Debug, Default)]
pub struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Load ==
    #[inline]
    pub fn record_load(&self, success: bool) {
        if success {
            self.load_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.load_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    // == Record Eviction ==
    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Returns the current counters together with the given entry count.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            load_successes: self.load_successes.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.load_count(), 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let counter = StatsCounter::new();
        counter.record_hit();
        counter.record_hit();
        counter.record_hit();
        assert_eq!(counter.snapshot(0).hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counter = StatsCounter::new();
        counter.record_hit();
        counter.record_miss();
        assert_eq!(counter.snapshot(0).hit_rate(), 0.5);
    }

    #[test]
    fn test_record_load_outcomes() {
        let counter = StatsCounter::new();
        counter.record_load(true);
        counter.record_load(true);
        counter.record_load(false);

        let stats = counter.snapshot(2);
        assert_eq!(stats.load_successes, 2);
        assert_eq!(stats.load_failures, 1);
        assert_eq!(stats.load_count(), 3);
        assert_eq!(stats.total_entries, 2);
    }

    #[test]
    fn test_record_eviction() {
        let counter = StatsCounter::new();
        counter.record_eviction();
        counter.record_eviction();
        assert_eq!(counter.snapshot(0).evictions, 2);
    }

    #[test]
    fn test_stats_serialize() {
        let counter = StatsCounter::new();
        counter.record_hit();

        let json = serde_json::to_value(counter.snapshot(1)).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["total_entries"], 1);
    }
}
