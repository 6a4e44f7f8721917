//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the life of a cache.
//!
//! # Tasks
//! - Eager reaper: evicts expired entries at the configured interval

mod reaper;

pub use reaper::{run_cycle, spawn_reaper, ReaperConfig, ReaperHandle};
