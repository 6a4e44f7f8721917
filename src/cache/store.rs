//! Entry Store Module
//!
//! Key-value storage with per-entry last-touch timestamps. Every mutation runs
//! under the store's write lock and updates occupancy inside that critical
//! section, so counts and contents never disagree.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cache::{CacheEntry, OccupancyMetrics, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

// == Entry Store ==
/// Concurrent storage shared by the cache facade and the reaper.
#[derive(Debug)]
pub struct EntryStore<V> {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    /// Occupancy and operation counters
    metrics: Arc<OccupancyMetrics>,
    /// Set once the owning cache is destroyed
    closed: AtomicBool,
}

impl<V: Clone> EntryStore<V> {
    // == Constructor ==
    pub fn new(metrics: Arc<OccupancyMetrics>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            metrics,
            closed: AtomicBool::new(false),
        }
    }

    pub fn metrics(&self) -> &Arc<OccupancyMetrics> {
        &self.metrics
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::StoreUnavailable("store is closed".to_string()));
        }
        Ok(())
    }

    // == Put ==
    /// Inserts or overwrites `key`, resetting its last-touch time.
    ///
    /// Returns `true` when the key was newly inserted.
    pub async fn put(&self, key: String, value: V, ttl: Duration) -> Result<bool> {
        validate_key(&key)?;
        self.ensure_open()?;

        let mut entries = self.entries.write().await;
        let now = Instant::now();
        match entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.value = value;
                entry.ttl = ttl;
                entry.touch(now);
                self.metrics.record_update();
                Ok(false)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl, now));
                self.metrics.record_insert();
                Ok(true)
            }
        }
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// Expired entries are reported as `NotFound` but left in place; removal
    /// belongs to [`EntryStore::evict_expired`]. With `touch` set, a hit
    /// resets the entry's last-touch time.
    pub async fn get(&self, key: &str, touch: bool) -> Result<V> {
        self.ensure_open()?;

        let found = if touch {
            let mut entries = self.entries.write().await;
            let now = Instant::now();
            match entries.get_mut(key) {
                Some(entry) if !entry.is_expired_at(now) => {
                    entry.touch(now);
                    Some(entry.value.clone())
                }
                _ => None,
            }
        } else {
            let entries = self.entries.read().await;
            let now = Instant::now();
            entries
                .get(key)
                .filter(|entry| !entry.is_expired_at(now))
                .map(|entry| entry.value.clone())
        };

        match found {
            Some(value) => {
                self.metrics.record_hit();
                Ok(value)
            }
            None => {
                self.metrics.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    // == Contains ==
    /// Whether `key` holds a live entry. Does not touch or count as a read.
    pub async fn contains_key(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries.get(key).is_some_and(|entry| !entry.is_expired_at(now)))
    }

    // == Delete ==
    /// Removes `key` if present. Absent keys are not an error.
    ///
    /// Returns `true` when an entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.metrics.record_removal();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // == Remove All ==
    /// Clears every entry in one critical section.
    ///
    /// Returns the number of entries removed.
    pub async fn remove_all(&self) -> Result<u64> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;
        let removed = entries.len() as u64;
        entries.clear();
        self.metrics.record_clear(removed);
        Ok(removed)
    }

    // == Snapshot Keys ==
    /// Copies the currently stored keys for a later scan.
    ///
    /// The copy is one pass under the read lock, released before any key is
    /// evaluated; `HashMap` has no cursor that survives inserts, so a borrowed
    /// lazy walk would hold the lock for the whole cycle and block writers.
    /// Cost is one `String` clone per stored key per reaper cycle.
    pub async fn snapshot_keys(&self) -> Result<KeySnapshot> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        Ok(KeySnapshot::new(entries.keys().cloned().collect()))
    }

    // == Evict Expired ==
    /// Removes each listed key that is still present and still expired.
    ///
    /// Keys already removed, or re-touched since they were listed, are skipped.
    /// Occupancy drops once per entry actually removed.
    pub async fn evict_expired(&self, keys: &[String]) -> Result<u64> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let mut evicted = 0u64;
        for key in keys {
            let expired = entries
                .get(key)
                .is_some_and(|entry| entry.is_expired_at(now));
            if expired && entries.remove(key).is_some() {
                evicted += 1;
            }
        }

        self.metrics.record_expirations(evicted);
        Ok(evicted)
    }

    // == Length ==
    /// Raw number of stored entries, including expired ones not yet reaped.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// == Store Control ==
/// Value-type independent lifecycle handle, used by the node registry.
pub trait StoreControl: Send + Sync {
    /// Rejects every later operation with `StoreUnavailable`.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

impl<V: Send + Sync> StoreControl for EntryStore<V> {
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// == Key Snapshot ==
/// Restartable sequence of keys captured from the store, consumed lazily in
/// batches.
///
/// Entries may change after the snapshot is taken; consumers must re-check
/// each key against the live store.
#[derive(Debug, Clone, Default)]
pub struct KeySnapshot {
    keys: Vec<String>,
    cursor: usize,
}

impl KeySnapshot {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys, cursor: 0 }
    }

    /// Returns the next `size` keys, or `None` once exhausted.
    pub fn next_batch(&mut self, size: usize) -> Option<&[String]> {
        if self.cursor >= self.keys.len() {
            return None;
        }
        let start = self.cursor;
        let end = (start + size.max(1)).min(self.keys.len());
        self.cursor = end;
        Some(&self.keys[start..end])
    }

    /// Rewinds to the first key.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// == Key Validation ==
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
