//! Eager Reaper Task
//!
//! Background task that periodically evicts expired entries without waiting
//! for a read to discover them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::cache::EntryStore;
use crate::error::{CacheError, Result};

/// Reaper scheduling parameters.
#[derive(Debug, Clone, Copy)]
pub struct ReaperConfig {
    /// Time between cycles
    pub interval: Duration,
    /// Keys evaluated per write-lock acquisition
    pub batch_size: usize,
}

/// Handle to a running reaper.
///
/// Dropping the handle also stops the task: the loop exits once its shutdown
/// sender is gone.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReaperHandle {
    /// Asks the reaper to stop after its in-flight batch.
    pub fn signal_shutdown(&self) {
        // Err only means the task already exited.
        let _ = self.shutdown_tx.send(true);
    }

    /// Signals shutdown and waits for the task to finish.
    pub async fn stop(&self) {
        self.signal_shutdown();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Reaper task ended abnormally");
            }
        }
    }
}

/// Spawns the eager reaper for `store`.
///
/// Each cycle snapshots the stored keys and evicts the expired ones in
/// batches, yielding between batches so writers are never starved. A cycle
/// failing with `StoreUnavailable` is skipped and retried on the next tick;
/// no error ever leaves the task.
///
/// # Example
/// ```ignore
/// let handle = spawn_reaper(store.clone(), config);
/// // Later, during shutdown:
/// handle.stop().await;
/// ```
pub fn spawn_reaper<V>(store: Arc<EntryStore<V>>, config: ReaperConfig) -> ReaperHandle
where
    V: Clone + Send + Sync + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(reaper_loop(store, config, shutdown_rx));

    ReaperHandle {
        shutdown_tx,
        task: Mutex::new(Some(task)),
    }
}

async fn reaper_loop<V>(
    store: Arc<EntryStore<V>>,
    config: ReaperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    V: Clone + Send + Sync + 'static,
{
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_ms = config.interval.as_millis() as u64,
        batch_size = config.batch_size,
        "Eager reaper started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Eager reaper shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                let metrics = store.metrics();
                match run_cycle(&store, config.batch_size, &shutdown_rx).await {
                    Ok(evicted) => {
                        metrics.record_reaper_cycle();
                        if evicted > 0 {
                            info!(evicted, size = metrics.count(), "Reaper cycle evicted expired entries");
                        } else {
                            trace!("Reaper cycle found no expired entries");
                        }
                    }
                    Err(CacheError::StoreUnavailable(reason)) => {
                        metrics.record_reaper_error();
                        debug!(%reason, "Store unavailable, skipping reaper cycle");
                    }
                    Err(e) => {
                        metrics.record_reaper_error();
                        error!(error = %e, "Reaper cycle failed");
                    }
                }
            }
        }
    }
}

/// Runs one scan over a key snapshot, returning the number of entries evicted.
///
/// Stops early, between batches, once shutdown is requested.
pub async fn run_cycle<V: Clone>(
    store: &EntryStore<V>,
    batch_size: usize,
    shutdown_rx: &watch::Receiver<bool>,
) -> Result<u64> {
    let mut snapshot = store.snapshot_keys().await?;
    let mut evicted = 0u64;

    while let Some(batch) = snapshot.next_batch(batch_size) {
        evicted += store.evict_expired(batch).await?;
        if *shutdown_rx.borrow() {
            debug!(evicted, "Reaper cycle interrupted by shutdown");
            break;
        }
        tokio::task::yield_now().await;
    }

    Ok(evicted)
}
