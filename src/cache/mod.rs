//! Cache Module
//!
//! In-memory caching with touch-based TTL expiration, eager background
//! eviction and a live occupancy counter.

mod entry;
mod expiry;
mod facade;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use expiry::{is_expired, TouchPolicy};
pub use facade::Cache;
pub(crate) use facade::CacheLifecycle;
pub use stats::{CacheStats, OccupancyMetrics};
pub use store::{EntryStore, KeySnapshot, StoreControl};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
