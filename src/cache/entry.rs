//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with touch-based TTL.

use std::time::Duration;

use tokio::time::Instant;

use crate::cache::expiry::is_expired;

// == Cache Entry ==
/// A stored value with its last-touch timestamp and the TTL it was written with.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Last time the entry was written (or read, under `TouchPolicy::OnAccess`)
    pub last_touch: Instant,
    /// Lifetime measured from `last_touch`
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry touched at `now`.
    pub fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            last_touch: now,
            ttl,
        }
    }

    // == Touch ==
    /// Resets the deadline to `now + ttl`.
    pub fn touch(&mut self, now: Instant) {
        self.last_touch = now;
    }

    // == Is Expired ==
    /// Checks the entry against the expiry predicate at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        is_expired(self.last_touch, now, self.ttl)
    }
}
