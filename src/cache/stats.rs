//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions, and
//! corrupt records tolerated during load.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found)
    pub misses: u64,
    /// Number of records evicted to satisfy the size bound
    pub evictions: u64,
    /// Number of corrupt records that truncated a load
    pub corrupt_records: u64,
    /// Current number of records in the cache
    pub total_entries: usize,
    /// Current sum of live payload sizes in bytes
    pub total_bytes: u64,
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

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Corruption ==
    /// Increments the corrupt-record counter.
    ///
    /// Tolerated corruption truncates a load silently from the caller's
    /// point of view; this counter keeps the degradation observable.
    pub fn record_corruption(&mut self) {
        self.corrupt_records += 1;
    }

    // == Update Gauges ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    /// Updates the total payload bytes gauge.
    pub fn set_total_bytes(&mut self, bytes: u64) {
        self.total_bytes = bytes;
    }
}
