//! Node Module
//!
//! In-process storage substrate hosting named caches.
//!
//! A node validates its role and discovery settings, prepares its working
//! directory and keeps a registry of caches by name. Transport between nodes
//! is not provided; every cache lives in this process.

mod discovery;

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

pub use discovery::{DiscoveryMode, PeerAddress};

use crate::cache::{Cache, CacheLifecycle};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Node Role ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    /// Hosts data itself; no discovery needed.
    Host,
    /// Joins peers located through `discovery`.
    Client { discovery: DiscoveryMode },
}

// == Node Config ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub role: NodeRole,
    /// Per-node working directory, created at start
    pub work_dir: PathBuf,
}

struct RegisteredCache {
    /// The `Cache<V>` handle, type-erased
    handle: Box<dyn Any + Send + Sync>,
    lifecycle: Arc<CacheLifecycle>,
}

// == Node ==
/// Registry of named caches.
pub struct Node {
    config: NodeConfig,
    peers: Vec<PeerAddress>,
    caches: Mutex<HashMap<String, RegisteredCache>>,
    stopped: AtomicBool,
}

impl Node {
    /// Validates the configuration and prepares the working directory.
    pub fn start(config: NodeConfig) -> Result<Self> {
        let peers = match &config.role {
            NodeRole::Host => Vec::new(),
            NodeRole::Client { discovery } => {
                let peers = discovery.resolve_peers()?;
                if peers.is_empty() {
                    return Err(CacheError::Configuration(
                        "client mode requires at least one discovery address".to_string(),
                    ));
                }
                peers
            }
        };

        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            CacheError::Configuration(format!(
                "cannot create work directory {}: {}",
                config.work_dir.display(),
                e
            ))
        })?;

        info!(
            client_mode = matches!(config.role, NodeRole::Client { .. }),
            peers = peers.len(),
            work_dir = %config.work_dir.display(),
            "Node started"
        );

        Ok(Self {
            config,
            peers,
            caches: Mutex::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn role(&self) -> &NodeRole {
        &self.config.role
    }

    pub fn peers(&self) -> &[PeerAddress] {
        &self.peers
    }

    pub fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    // == Get Or Create ==
    /// Returns the cache called `name`, creating it with `config` if absent.
    ///
    /// An existing cache keeps its original configuration. Requesting it with
    /// a different value type is a configuration error.
    pub async fn get_or_create_cache<V>(&self, name: &str, config: CacheConfig) -> Result<Cache<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let mut caches = self.caches.lock().await;
        if self.stopped.load(Ordering::Acquire) {
            return Err(CacheError::StoreUnavailable("node is stopped".to_string()));
        }

        if let Some(registered) = caches.get(name) {
            debug!(cache = name, "Returning existing cache");
            return registered
                .handle
                .downcast_ref::<Cache<V>>()
                .cloned()
                .ok_or_else(|| {
                    CacheError::Configuration(format!(
                        "cache {} already exists with a different value type",
                        name
                    ))
                });
        }

        let cache = Cache::<V>::start(name, config)?;
        caches.insert(
            name.to_string(),
            RegisteredCache {
                handle: Box::new(cache.clone()),
                lifecycle: cache.lifecycle(),
            },
        );
        Ok(cache)
    }

    /// Names of every live cache, sorted.
    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops and unregisters `name`. Returns false if no such cache exists.
    pub async fn destroy_cache(&self, name: &str) -> bool {
        let registered = self.caches.lock().await.remove(name);
        match registered {
            Some(registered) => {
                registered.lifecycle.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Destroys every cache; later `get_or_create_cache` calls fail.
    pub async fn stop(&self) {
        let drained: Vec<RegisteredCache> = {
            let mut caches = self.caches.lock().await;
            self.stopped.store(true, Ordering::Release);
            caches.drain().map(|(_, registered)| registered).collect()
        };

        for registered in &drained {
            registered.lifecycle.shutdown().await;
        }
        info!(caches = drained.len(), "Node stopped");
    }
}
