//! Configuration Module
//!
//! Loads process configuration from environment variables and derives the
//! cache, node and harness configurations from it.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::TouchPolicy;
use crate::error::{CacheError, Result};
use crate::harness::HarnessConfig;
use crate::node::{DiscoveryMode, NodeConfig, NodeRole};

/// Process configuration parameters.
///
/// Unset variables fall back to the reference scenario's values. A variable
/// that is set but cannot be parsed is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name of the cache container
    pub cache_name: String,
    /// Entry TTL in seconds
    pub ttl_secs: u64,
    /// Reaper period in milliseconds
    pub reaper_interval_ms: u64,
    /// Keys evaluated per reaper lock acquisition
    pub reaper_batch_size: usize,
    /// Join an existing node group instead of hosting
    pub client_mode: bool,
    /// Peer addresses, `host:port` or `host:first..last`
    pub discovery_addresses: Vec<String>,
    /// Node working directory
    pub work_dir: PathBuf,
    /// Entries written per load attempt
    pub load_entries: u64,
    /// Payload length of each synthetic entry
    pub payload_chars: usize,
    /// Number of load attempts
    pub attempts: u32,
    /// Extra wait beyond the TTL before validating expiry, in seconds
    pub grace_secs: u64,
    /// Validation retries once the grace period is over
    pub max_retries: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAME` - Cache container name (default: dummy_cache)
    /// - `CACHE_TTL_SECS` - Entry TTL in seconds (default: 10)
    /// - `REAPER_INTERVAL_MS` - Reaper period (default: 1000)
    /// - `REAPER_BATCH_SIZE` - Keys per reaper batch (default: 4096)
    /// - `CLIENT_MODE` - true to join as a client (default: false)
    /// - `DISCOVERY_ADDRESSES` - Comma-separated peers (default: none)
    /// - `WORK_DIR` - Node working directory (default: $TMPDIR/eager_cache)
    /// - `LOAD_ENTRIES` - Entries per attempt (default: 100000)
    /// - `LOAD_PAYLOAD_CHARS` - Payload length (default: 10)
    /// - `LOAD_ATTEMPTS` - Attempts (default: 30)
    /// - `LOAD_GRACE_SECS` - Grace beyond TTL (default: 10)
    /// - `LOAD_MAX_RETRIES` - Expiry validation retries (default: 2)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let discovery_addresses = match lookup("DISCOVERY_ADDRESSES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.discovery_addresses,
        };

        let config = Self {
            cache_name: lookup("CACHE_NAME").unwrap_or(defaults.cache_name),
            ttl_secs: parse_var(&lookup, "CACHE_TTL_SECS", defaults.ttl_secs)?,
            reaper_interval_ms: parse_var(
                &lookup,
                "REAPER_INTERVAL_MS",
                defaults.reaper_interval_ms,
            )?,
            reaper_batch_size: parse_var(
                &lookup,
                "REAPER_BATCH_SIZE",
                defaults.reaper_batch_size,
            )?,
            client_mode: parse_var(&lookup, "CLIENT_MODE", defaults.client_mode)?,
            discovery_addresses,
            work_dir: lookup("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            load_entries: parse_var(&lookup, "LOAD_ENTRIES", defaults.load_entries)?,
            payload_chars: parse_var(&lookup, "LOAD_PAYLOAD_CHARS", defaults.payload_chars)?,
            attempts: parse_var(&lookup, "LOAD_ATTEMPTS", defaults.attempts)?,
            grace_secs: parse_var(&lookup, "LOAD_GRACE_SECS", defaults.grace_secs)?,
            max_retries: parse_var(&lookup, "LOAD_MAX_RETRIES", defaults.max_retries)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache_name.trim().is_empty() {
            return Err(CacheError::Configuration(
                "cache name must not be empty".to_string(),
            ));
        }
        require_positive("CACHE_TTL_SECS", self.ttl_secs)?;
        require_positive("REAPER_INTERVAL_MS", self.reaper_interval_ms)?;
        require_positive("REAPER_BATCH_SIZE", self.reaper_batch_size as u64)?;
        require_positive("LOAD_ENTRIES", self.load_entries)?;
        require_positive("LOAD_PAYLOAD_CHARS", self.payload_chars as u64)?;
        require_positive("LOAD_ATTEMPTS", u64::from(self.attempts))?;

        let cache = self.cache_config();
        cache.validate()?;
        self.harness_config()
            .validate_for(cache.ttl, cache.eager_ttl.then_some(cache.reaper_interval))
    }

    /// Cache settings for the configured container.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.ttl_secs),
            reaper_interval: Duration::from_millis(self.reaper_interval_ms),
            reaper_batch_size: self.reaper_batch_size,
            ..CacheConfig::default()
        }
    }

    /// Node settings: host role unless client mode is requested.
    pub fn node_config(&self) -> NodeConfig {
        let role = if self.client_mode {
            NodeRole::Client {
                discovery: DiscoveryMode::DirectIp {
                    addresses: self.discovery_addresses.clone(),
                },
            }
        } else {
            NodeRole::Host
        };

        NodeConfig {
            role,
            work_dir: self.work_dir.clone(),
        }
    }

    /// Load scenario settings. Expiry waits follow the cache's own TTL.
    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            name: "LOOP".to_string(),
            entries: self.load_entries,
            payload_chars: self.payload_chars,
            attempts: self.attempts,
            grace: Duration::from_secs(self.grace_secs),
            max_retries: self.max_retries,
            retry_delay: None,
            ..HarnessConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_name: "dummy_cache".to_string(),
            ttl_secs: 10,
            reaper_interval_ms: 1000,
            reaper_batch_size: 4096,
            client_mode: false,
            discovery_addresses: Vec::new(),
            work_dir: env::temp_dir().join("eager_cache"),
            load_entries: 100_000,
            payload_chars: 10,
            attempts: 30,
            grace_secs: 10,
            max_retries: 2,
        }
    }
}

// == Cache Config ==
/// Per-cache settings, fixed for the cache's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of an entry after its last touch
    pub ttl: Duration,
    /// Run the background reaper; when false, reads evict expired entries
    pub eager_ttl: bool,
    /// Reaper period
    pub reaper_interval: Duration,
    /// Keys evaluated per reaper lock acquisition
    pub reaper_batch_size: usize,
    /// Start with operation counters enabled
    pub statistics_enabled: bool,
    /// Which operations reset the deadline
    pub touch: TouchPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            eager_ttl: true,
            reaper_interval: Duration::from_secs(1),
            reaper_batch_size: 4096,
            statistics_enabled: true,
            touch: TouchPolicy::OnWrite,
        }
    }
}

impl CacheConfig {
    /// Fails on non-positive durations; never clamps.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::Configuration(
                "TTL must be greater than zero".to_string(),
            ));
        }
        if self.eager_ttl {
            if self.reaper_interval.is_zero() {
                return Err(CacheError::Configuration(
                    "reaper interval must be greater than zero".to_string(),
                ));
            }
            if self.reaper_batch_size == 0 {
                return Err(CacheError::Configuration(
                    "reaper batch size must be greater than zero".to_string(),
                ));
            }
            if self.reaper_interval > self.ttl / 2 {
                warn!(
                    ttl_ms = self.ttl.as_millis() as u64,
                    interval_ms = self.reaper_interval.as_millis() as u64,
                    "Reaper interval exceeds half the TTL; occupancy may lag expiry"
                );
            }
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            CacheError::Configuration(format!("{} has an invalid value: {:?}", name, raw))
        }),
        None => Ok(default),
    }
}

fn require_positive(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(CacheError::Configuration(format!(
            "{} must be greater than zero",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_name, "dummy_cache");
        assert_eq!(config.ttl_secs, 10);
        assert_eq!(config.load_entries, 100_000);
        assert_eq!(config.payload_chars, 10);
        assert_eq!(config.attempts, 30);
        assert_eq!(config.grace_secs, 10);
        assert_eq!(config.max_retries, 2);
        assert!(!config.client_mode);
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CACHE_TTL_SECS", "4"),
            ("REAPER_INTERVAL_MS", "500"),
            ("CLIENT_MODE", "true"),
            ("DISCOVERY_ADDRESSES", "cache-host:47500..47510, 10.0.0.1:47500"),
            ("LOAD_ENTRIES", "1000"),
        ]))
        .unwrap();

        assert_eq!(config.ttl_secs, 4);
        assert_eq!(config.reaper_interval_ms, 500);
        assert!(config.client_mode);
        assert_eq!(
            config.discovery_addresses,
            vec!["cache-host:47500..47510".to_string(), "10.0.0.1:47500".to_string()]
        );
        assert_eq!(config.load_entries, 1000);
    }

    #[test]
    fn test_config_rejects_malformed_ttl() {
        let result = Config::from_lookup(lookup_from(&[("CACHE_TTL_SECS", "ten")]));
        assert!(matches!(result, Err(CacheError::Configuration(_))));

        let result = Config::from_lookup(lookup_from(&[("CACHE_TTL_SECS", "-3")]));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_config_rejects_zero_values() {
        for var in ["CACHE_TTL_SECS", "REAPER_INTERVAL_MS", "LOAD_ATTEMPTS"] {
            let result = Config::from_lookup(lookup_from(&[(var, "0")]));
            assert!(
                matches!(result, Err(CacheError::Configuration(_))),
                "{} = 0 should be rejected",
                var
            );
        }
    }

    #[test]
    fn test_config_rejects_grace_shorter_than_interval() {
        let result = Config::from_lookup(lookup_from(&[
            ("REAPER_INTERVAL_MS", "5000"),
            ("CACHE_TTL_SECS", "30"),
            ("LOAD_GRACE_SECS", "2"),
        ]));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_derived_configs() {
        let config = Config::default();

        let cache = config.cache_config();
        assert_eq!(cache.ttl, Duration::from_secs(10));
        assert!(cache.eager_ttl);

        let harness = config.harness_config();
        assert_eq!(harness.grace, Duration::from_secs(10));
        assert_eq!(harness.retry_delay, None);
        assert_eq!(harness.entries, 100_000);

        assert_eq!(config.node_config().role, NodeRole::Host);
    }

    #[test]
    fn test_cache_config_validation() {
        assert!(CacheConfig::default().validate().is_ok());

        let lazy = CacheConfig {
            eager_ttl: false,
            reaper_interval: Duration::ZERO,
            ..CacheConfig::default()
        };
        assert!(lazy.validate().is_ok());

        let bad = CacheConfig {
            reaper_interval: Duration::ZERO,
            ..CacheConfig::default()
        };
        assert!(matches!(bad.validate(), Err(CacheError::Configuration(_))));
    }
}
