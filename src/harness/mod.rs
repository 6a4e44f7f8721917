//! Load-Validation Harness
//!
//! Writes bulk synthetic entries through a [`Cache`](crate::cache::Cache) and
//! asserts that occupancy rises by exactly the inserted count, then returns
//! to zero within TTL + grace, with a bounded number of retries. The TTL is
//! always the cache's own.

mod data;
mod polling;
mod scenario;

use std::time::Duration;

pub use data::{estimated_footprint_bytes, random_payload, SyntheticRecord};
pub use polling::{poll_until, sleep_or_cancel, Polled, RetryPolicy};
pub use scenario::{AttemptOutcome, AttemptReport, LoadHarness, RunReport, ScenarioState};

use crate::error::{CacheError, Result};

/// Scenario parameters. Defaults reproduce the reference load run against a
/// cache with the default 10 s TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Label used in log lines and the run report
    pub name: String,
    /// Distinct entries written per attempt
    pub entries: u64,
    /// Payload length of each entry
    pub payload_chars: usize,
    /// Number of clear / write / expire cycles
    pub attempts: u32,
    /// Extra wait beyond the cache TTL before the first expiry check;
    /// at least one reaper interval
    pub grace: Duration,
    /// Expiry re-checks after the first one
    pub max_retries: u32,
    /// Wait between expiry re-checks; `None` waits one cache TTL
    pub retry_delay: Option<Duration>,
    /// Wait between clearing and checking for zero
    pub clear_settle: Duration,
    /// Wait before sampling the size ahead of the writes
    pub pre_write_settle: Duration,
    /// Wait between the last write and the count check
    pub write_settle: Duration,
    /// End the run at the first failed attempt
    pub stop_on_failure: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            name: "LOOP".to_string(),
            entries: 100_000,
            payload_chars: 10,
            attempts: 30,
            grace: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: None,
            clear_settle: Duration::from_secs(1),
            pre_write_settle: Duration::from_secs(2),
            write_settle: Duration::from_secs(2),
            stop_on_failure: true,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(CacheError::Configuration(
                "harness needs at least one attempt".to_string(),
            ));
        }
        if self.max_retries > 0 && self.retry_delay.is_some_and(|delay| delay.is_zero()) {
            return Err(CacheError::Configuration(
                "retry delay must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks the scenario against the cache it will drive.
    ///
    /// `reaper_interval` is `None` for a cache without a reaper.
    pub fn validate_for(&self, ttl: Duration, reaper_interval: Option<Duration>) -> Result<()> {
        self.validate()?;
        if ttl.is_zero() {
            return Err(CacheError::Configuration(
                "cache TTL must be greater than zero".to_string(),
            ));
        }
        if let Some(interval) = reaper_interval {
            if self.grace < interval {
                return Err(CacheError::Configuration(format!(
                    "grace of {:?} is shorter than the reaper interval of {:?}",
                    self.grace, interval
                )));
            }
        }
        Ok(())
    }
}
