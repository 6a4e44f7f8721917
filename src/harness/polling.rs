//! Cancellable waits and bounded polling.
//!
//! Every wait in the harness goes through here so a scenario can be aborted
//! at any point and no poll loop is unbounded.

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Resolves once `cancel` reads true. Never resolves if its sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sleeps for `duration` unless cancelled first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &mut watch::Receiver<bool>) -> Result<()> {
    if *cancel.borrow() {
        return Err(CacheError::Cancelled);
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = cancelled(cancel) => Err(CacheError::Cancelled),
    }
}

/// Retry budget for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

/// Result of a bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polled<T> {
    /// Last probed value
    pub value: T,
    /// Extra probes taken after the first
    pub retries: u32,
    /// Whether `value` satisfied the predicate
    pub accepted: bool,
}

/// Probes once, then up to `policy.max_retries` more times with
/// `policy.delay` between probes, stopping at the first accepted value.
pub async fn poll_until<T, P, A>(
    policy: RetryPolicy,
    cancel: &mut watch::Receiver<bool>,
    mut probe: P,
    accept: A,
) -> Result<Polled<T>>
where
    T: std::fmt::Debug,
    P: FnMut() -> T,
    A: Fn(&T) -> bool,
{
    let mut value = probe();
    let mut retries = 0;

    while !accept(&value) && retries < policy.max_retries {
        retries += 1;
        debug!(?value, retry = retries, max = policy.max_retries, "Probe not accepted, retrying");
        sleep_or_cancel(policy.delay, cancel).await?;
        value = probe();
    }

    let accepted = accept(&value);
    Ok(Polled {
        value,
        retries,
        accepted,
    })
}
