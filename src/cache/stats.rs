//! Cache Statistics Module
//!
//! Live occupancy counter plus optional operation counters.
//!
//! Occupancy is only ever changed by the entry store while it holds its write
//! lock, so every increment and decrement pairs with exactly one map mutation.
//! Readers load it without touching the store lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use tracing::error;

// == Occupancy Metrics ==
/// Shared counters for one cache.
#[derive(Debug)]
pub struct OccupancyMetrics {
    /// Entries currently stored and not yet evicted
    live: AtomicU64,
    /// Whether the operation counters below are updated
    statistics_enabled: AtomicBool,
    puts: AtomicU64,
    updates: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    removals: AtomicU64,
    clears: AtomicU64,
    reaper_cycles: AtomicU64,
    reaper_errors: AtomicU64,
}

impl Default for OccupancyMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OccupancyMetrics {
    // == Constructor ==
    /// Creates metrics with every counter at zero.
    pub fn new(statistics_enabled: bool) -> Self {
        Self {
            live: AtomicU64::new(0),
            statistics_enabled: AtomicBool::new(statistics_enabled),
            puts: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            clears: AtomicU64::new(0),
            reaper_cycles: AtomicU64::new(0),
            reaper_errors: AtomicU64::new(0),
        }
    }

    // == Count ==
    /// Number of live entries.
    pub fn count(&self) -> u64 {
        self.live.load(Ordering::Acquire)
    }

    pub fn set_statistics_enabled(&self, enabled: bool) {
        self.statistics_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn statistics_enabled(&self) -> bool {
        self.statistics_enabled.load(Ordering::Relaxed)
    }

    fn bump(&self, counter: &AtomicU64, n: u64) {
        if self.statistics_enabled() {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Decrements occupancy by `n`, stopping at zero.
    fn release(&self, n: u64) {
        let result = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| live.checked_sub(n));
        if let Err(live) = result {
            // Unreachable while the store owns every mutation; keep the count sane anyway.
            error!(live, requested = n, "occupancy underflow, resetting to zero");
            self.live.store(0, Ordering::Release);
        }
    }

    // == Store Hooks ==
    /// A new key was inserted.
    pub(crate) fn record_insert(&self) {
        self.live.fetch_add(1, Ordering::AcqRel);
        self.bump(&self.puts, 1);
    }

    /// An existing key was overwritten.
    pub(crate) fn record_update(&self) {
        self.bump(&self.puts, 1);
        self.bump(&self.updates, 1);
    }

    /// An explicit delete removed an entry.
    pub(crate) fn record_removal(&self) {
        self.release(1);
        self.bump(&self.removals, 1);
    }

    /// Expired entries were evicted.
    pub(crate) fn record_expirations(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.release(n);
        self.bump(&self.expirations, n);
    }

    /// The store was cleared of `n` entries.
    pub(crate) fn record_clear(&self, n: u64) {
        self.release(n);
        self.bump(&self.removals, n);
        self.bump(&self.clears, 1);
    }

    pub(crate) fn record_hit(&self) {
        self.bump(&self.hits, 1);
    }

    pub(crate) fn record_miss(&self) {
        self.bump(&self.misses, 1);
    }

    /// Reaper bookkeeping is always recorded; it describes the engine, not traffic.
    pub(crate) fn record_reaper_cycle(&self) {
        self.reaper_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reaper_error(&self) {
        self.reaper_errors.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            size: self.count(),
            puts: self.puts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            reaper_cycles: self.reaper_cycles.load(Ordering::Relaxed),
            reaper_errors: self.reaper_errors.load(Ordering::Relaxed),
        }
    }
}

// == Cache Stats ==
/// Snapshot of cache metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live entries
    pub size: u64,
    /// Successful writes, inserts and overwrites
    pub puts: u64,
    /// Writes that overwrote an existing key
    pub updates: u64,
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries evicted because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by delete or clear
    pub removals: u64,
    /// Number of clear operations
    pub clears: u64,
    /// Completed reaper cycles
    pub reaper_cycles: u64,
    /// Reaper cycles skipped because the store was unavailable
    pub reaper_errors: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
