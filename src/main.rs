//! Eager Cache - load validation run
//!
//! Starts a node, creates the configured cache and runs the load harness
//! against it, printing the run report as JSON.

use anyhow::{bail, Context};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eager_cache::harness::SyntheticRecord;
use eager_cache::{Cache, Config, LoadHarness, Node};

/// Main entry point for the load validation run.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Start the node and create the named cache (starts its reaper)
/// 4. Run the harness; Ctrl+C/SIGTERM cancels it
/// 5. Print the report, stop the node
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eager_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Eager Cache load run");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: cache={}, ttl={}s, reaper_interval={}ms, entries={}, attempts={}",
        config.cache_name,
        config.ttl_secs,
        config.reaper_interval_ms,
        config.load_entries,
        config.attempts
    );

    let node = Node::start(config.node_config()).context("Failed to start node")?;
    let cache: Cache<SyntheticRecord> = node
        .get_or_create_cache(&config.cache_name, config.cache_config())
        .await
        .context("Failed to create cache")?;
    info!("Cache {} ready", cache.name());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        let _ = cancel_tx.send(true);
    });

    let mut harness = LoadHarness::new(cache.clone(), config.harness_config())?
        .with_cancellation(cancel_rx);
    let report = harness.run().await;
    signal_task.abort();

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!("Final cache metrics: {:?}", cache.metrics());

    node.stop().await;
    info!("Load run complete");

    if !report.is_success() {
        bail!(
            "load run failed: {} of {} attempts failed",
            report.failed,
            report.attempts.len()
        );
    }
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling load run...");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling load run...");
        }
    }
}
