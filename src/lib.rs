//! Eager Cache - an in-memory cache with touch-based TTL
//!
//! Entries expire a fixed time after their last write and are removed by a
//! background reaper. A load harness drives bulk writes and checks that
//! occupancy returns to zero once the TTL has passed.

pub mod cache;
pub mod config;
pub mod error;
pub mod harness;
pub mod node;
pub mod tasks;

pub use cache::Cache;
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use harness::{HarnessConfig, LoadHarness};
pub use node::Node;
