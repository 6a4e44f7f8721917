//! Load scenario state machine.
//!
//! `Idle → Clearing → Writing → AwaitingExpiry → Validating → Done | Failed`
//!
//! Each attempt starts by clearing the cache, so a failed attempt never leaks
//! state into the next one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::cache::Cache;
use crate::error::{CacheError, Result};
use crate::harness::data::{estimated_footprint_bytes, random_payload, SyntheticRecord};
use crate::harness::polling::{poll_until, sleep_or_cancel, RetryPolicy};
use crate::harness::HarnessConfig;

/// Puts between cancellation checks while writing.
const CANCEL_CHECK_EVERY: u64 = 10_000;

// == Scenario State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Idle,
    Clearing,
    Writing,
    AwaitingExpiry,
    Validating,
    Done,
    Failed,
}

// == Reports ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Done,
    Failed { stage: ScenarioState, reason: String },
}

/// What one attempt observed.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub size_before: Option<u64>,
    pub size_after_write: Option<u64>,
    pub final_size: Option<u64>,
    pub retries_used: u32,
    pub elapsed_ms: u64,
    /// Typed failure, for callers matching on it
    #[serde(skip)]
    pub error: Option<CacheError>,
}

impl AttemptReport {
    fn new(attempt: u32) -> Self {
        Self {
            attempt,
            started_at: Utc::now(),
            outcome: AttemptOutcome::Done,
            size_before: None,
            size_after_write: None,
            final_size: None,
            retries_used: 0,
            elapsed_ms: 0,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.outcome == AttemptOutcome::Done
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub name: String,
    pub attempts: Vec<AttemptReport>,
    pub passed: u32,
    pub failed: u32,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.passed > 0
    }
}

// == Load Harness ==
/// Drives bulk writes through a cache and checks the expiry guarantee.
pub struct LoadHarness {
    cache: Cache<SyntheticRecord>,
    config: HarnessConfig,
    cancel: watch::Receiver<bool>,
    state: ScenarioState,
}

impl LoadHarness {
    /// Creates a harness over `cache`. Without [`LoadHarness::with_cancellation`]
    /// the run cannot be cancelled.
    ///
    /// Expiry waits use the cache's TTL; the grace must cover one reaper
    /// interval.
    pub fn new(cache: Cache<SyntheticRecord>, config: HarnessConfig) -> Result<Self> {
        config.validate_for(cache.ttl(), cache.reaper_interval())?;
        let (_never, cancel) = watch::channel(false);
        Ok(Self {
            cache,
            config,
            cancel,
            state: ScenarioState::Idle,
        })
    }

    /// Aborts the scenario as soon as `cancel` reads true.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn transition(&mut self, next: ScenarioState) {
        debug!(name = %self.config.name, from = ?self.state, to = ?next, "Scenario transition");
        self.state = next;
    }

    // == Run ==
    /// Repeats the attempt cycle `config.attempts` times.
    pub async fn run(&mut self) -> RunReport {
        let mut report = RunReport {
            name: self.config.name.clone(),
            attempts: Vec::with_capacity(self.config.attempts as usize),
            passed: 0,
            failed: 0,
        };

        for attempt in 1..=self.config.attempts {
            let outcome = self.run_attempt(attempt).await;
            let cancelled = outcome.error == Some(CacheError::Cancelled);
            if outcome.is_done() {
                report.passed += 1;
            } else {
                report.failed += 1;
            }
            report.attempts.push(outcome);

            if report.failed > 0 && (self.config.stop_on_failure || cancelled) {
                break;
            }
        }

        info!(
            name = %report.name,
            passed = report.passed,
            failed = report.failed,
            "Load run finished"
        );
        report
    }

    // == Run Attempt ==
    /// Runs a single clear / write / expire / validate cycle.
    pub async fn run_attempt(&mut self, attempt: u32) -> AttemptReport {
        let started = Instant::now();
        let mut report = AttemptReport::new(attempt);
        self.state = ScenarioState::Idle;

        info!("Start attempt : {}", attempt);
        let result = self.drive(&mut report).await;
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                self.transition(ScenarioState::Done);
                info!("End attempt : {}", attempt);
            }
            Err(e) => {
                let stage = self.state;
                self.transition(ScenarioState::Failed);
                error!(attempt, ?stage, error = %e, "Attempt failed");
                report.outcome = AttemptOutcome::Failed {
                    stage,
                    reason: e.to_string(),
                };
                report.error = Some(e);
            }
        }
        report
    }

    async fn drive(&mut self, report: &mut AttemptReport) -> Result<()> {
        self.clear().await?;
        self.write(report).await?;
        self.await_expiry().await?;
        self.validate_expiry(report).await
    }

    // == Clearing ==
    async fn clear(&mut self) -> Result<()> {
        self.transition(ScenarioState::Clearing);
        self.cache.remove_all().await?;
        sleep_or_cancel(self.config.clear_settle, &mut self.cancel).await?;

        let size = self.cache.size();
        if size != 0 {
            return Err(CacheError::validation("clear", 0, size));
        }
        info!("[INIT] Cache cleared.");
        Ok(())
    }

    // == Writing ==
    async fn write(&mut self, report: &mut AttemptReport) -> Result<()> {
        self.transition(ScenarioState::Writing);
        let name = self.config.name.clone();
        let entries = self.config.entries;

        sleep_or_cancel(self.config.pre_write_settle, &mut self.cancel).await?;
        let before = self.cache.size();
        report.size_before = Some(before);
        info!("[{}] Before cache size : {}", name, before);

        let data = random_payload(self.config.payload_chars);
        let footprint = estimated_footprint_bytes(self.config.payload_chars);
        info!("[{}] Memory footprint per object: {} octets", name, footprint);
        info!(
            "[{}] Total Memory used expected: {} octets",
            name,
            footprint.saturating_mul(entries)
        );

        for i in 0..entries {
            if i % CANCEL_CHECK_EVERY == 0 && *self.cancel.borrow() {
                return Err(CacheError::Cancelled);
            }
            let record = SyntheticRecord::with_random_key(&data);
            self.cache.put(record.key.clone(), record).await?;
        }

        sleep_or_cancel(self.config.write_settle, &mut self.cancel).await?;
        let after = self.cache.size();
        report.size_after_write = Some(after);
        info!("[{}] After cache size : {}", name, after);

        let expected = before + entries;
        if after != expected {
            return Err(CacheError::validation("write", expected, after));
        }
        Ok(())
    }

    // == Awaiting Expiry ==
    async fn await_expiry(&mut self) -> Result<()> {
        self.transition(ScenarioState::AwaitingExpiry);
        let ttl = self.cache.ttl();
        info!(
            "[{}] Waiting for expiration in {}s",
            self.config.name,
            ttl.as_secs()
        );
        let wait = ttl + self.config.grace;
        sleep_or_cancel(wait, &mut self.cancel).await
    }

    // == Validating ==
    async fn validate_expiry(&mut self, report: &mut AttemptReport) -> Result<()> {
        self.transition(ScenarioState::Validating);
        let policy = RetryPolicy {
            max_retries: self.config.max_retries,
            delay: self.config.retry_delay.unwrap_or_else(|| self.cache.ttl()),
        };

        let cache = &self.cache;
        let polled = poll_until(policy, &mut self.cancel, || cache.size(), |size| *size == 0).await?;

        report.final_size = Some(polled.value);
        report.retries_used = polled.retries;
        info!("[{}] Final cache size {}", self.config.name, polled.value);

        if !polled.accepted {
            return Err(CacheError::validation("expiry", 0, polled.value));
        }
        Ok(())
    }
}
