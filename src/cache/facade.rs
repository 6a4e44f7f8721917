//! Cache Facade Module
//!
//! Public surface composing the entry store, the expiry policy, occupancy
//! metrics and the eager reaper.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheStats, EntryStore, OccupancyMetrics, StoreControl, TouchPolicy};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_reaper, ReaperConfig, ReaperHandle};

// == Cache Lifecycle ==
/// Value-type independent half of a cache: its reaper and close switch.
pub(crate) struct CacheLifecycle {
    name: Arc<str>,
    store: Arc<dyn StoreControl>,
    reaper: Option<ReaperHandle>,
}

impl CacheLifecycle {
    /// Stops the reaper, then closes the store.
    pub(crate) async fn shutdown(&self) {
        if let Some(reaper) = &self.reaper {
            reaper.stop().await;
        }
        self.store.close();
        info!(cache = %self.name, "Cache closed");
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.store.is_closed()
    }
}

// == Cache ==
/// Handle to a named cache. Clones share the same store.
///
/// Writes reset the entry's TTL; reads do so only under
/// [`TouchPolicy::OnAccess`]. With eager TTL enabled the reaper is the only
/// component that evicts expired entries.
pub struct Cache<V> {
    store: Arc<EntryStore<V>>,
    lifecycle: Arc<CacheLifecycle>,
    /// TTL stamped on entries written through this handle
    ttl: Duration,
    touch: TouchPolicy,
    /// Reaper period; `None` in lazy mode
    reaper_interval: Option<Duration>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lifecycle: Arc::clone(&self.lifecycle),
            ttl: self.ttl,
            touch: self.touch,
            reaper_interval: self.reaper_interval,
        }
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and, when eager TTL is enabled, starts its reaper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(name: &str, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(OccupancyMetrics::new(config.statistics_enabled));
        let store = Arc::new(EntryStore::new(metrics));

        let reaper = config.eager_ttl.then(|| {
            spawn_reaper(
                Arc::clone(&store),
                ReaperConfig {
                    interval: config.reaper_interval,
                    batch_size: config.reaper_batch_size,
                },
            )
        });

        info!(
            cache = name,
            ttl_secs = config.ttl.as_secs_f64(),
            eager_ttl = config.eager_ttl,
            touch = ?config.touch,
            "Cache started"
        );

        let control: Arc<dyn StoreControl> = store.clone();
        Ok(Self {
            store,
            lifecycle: Arc::new(CacheLifecycle {
                name: Arc::from(name),
                store: control,
                reaper,
            }),
            ttl: config.ttl,
            touch: config.touch,
            reaper_interval: config.eager_ttl.then_some(config.reaper_interval),
        })
    }

    // == With TTL ==
    /// Returns a view over the same store whose writes use `ttl`.
    pub fn with_ttl(&self, ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(CacheError::Configuration(
                "TTL must be greater than zero".to_string(),
            ));
        }
        let mut view = self.clone();
        view.ttl = ttl;
        Ok(view)
    }

    // == Put ==
    /// Inserts or overwrites `key`, resetting its deadline to now + TTL.
    pub async fn put(&self, key: impl Into<String>, value: V) -> Result<()> {
        self.store.put(key.into(), value, self.ttl).await?;
        Ok(())
    }

    // == Get ==
    /// Returns the live value for `key`, or `NotFound`.
    pub async fn get(&self, key: &str) -> Result<V> {
        let result = self.store.get(key, self.touch.touches_on_read()).await;

        if self.reaper_interval.is_none() {
            if let Err(CacheError::NotFound(_)) = &result {
                // Lazy mode: the read that discovers an expired entry evicts it
                let evicted = self.store.evict_expired(&[key.to_string()]).await?;
                if evicted > 0 {
                    debug!(key, "Lazily evicted expired entry");
                }
            }
        }

        result
    }

    // == Contains ==
    pub async fn contains_key(&self, key: &str) -> Result<bool> {
        self.store.contains_key(key).await
    }

    // == Delete ==
    /// Removes `key`; returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete(key).await
    }

    // == Remove All ==
    /// Removes every entry. Clearing an empty cache is not an error.
    pub async fn remove_all(&self) -> Result<()> {
        let removed = self.store.remove_all().await?;
        debug!(cache = %self.lifecycle.name, removed, "Cache cleared");
        Ok(())
    }

    // == Size ==
    /// Number of live entries, as tracked by the occupancy counter.
    pub fn size(&self) -> u64 {
        self.store.metrics().count()
    }

    // == Stats ==
    pub fn metrics(&self) -> CacheStats {
        self.store.metrics().snapshot()
    }

    /// Turns the hit/miss/put counters on or off. Occupancy is always tracked.
    pub fn enable_statistics(&self, enabled: bool) {
        self.store.metrics().set_statistics_enabled(enabled);
    }

    pub fn name(&self) -> &str {
        &self.lifecycle.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Period of the eager reaper, or `None` when reads evict lazily.
    pub fn reaper_interval(&self) -> Option<Duration> {
        self.reaper_interval
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    /// Stops the reaper and closes the store for every handle.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }

    pub(crate) fn lifecycle(&self) -> Arc<CacheLifecycle> {
        Arc::clone(&self.lifecycle)
    }
}
