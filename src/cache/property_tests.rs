//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check occupancy accounting and expiry timing. Each case
//! runs on its own paused-clock runtime so TTLs elapse instantly.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::cache::{EntryStore, OccupancyMetrics};
use crate::tasks::run_cycle;

// == Test Configuration ==
const TTL_SECS: u64 = 10;
const TTL: Duration = Duration::from_secs(TTL_SECS);

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

fn new_store() -> Arc<EntryStore<String>> {
    Arc::new(EntryStore::new(Arc::new(OccupancyMetrics::default())))
}

async fn reap(store: &EntryStore<String>) -> u64 {
    let (_tx, rx) = watch::channel(false);
    run_cycle(store, 7, &rx).await.unwrap()
}

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

/// Generates valid cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

/// Operations over a small key space so keys collide often
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: u8 },
    Delete { key: u8 },
    RemoveAll,
    Advance { secs: u64 },
    Reap,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (0u8..16).prop_map(|key| CacheOp::Put { key }),
        2 => (0u8..16).prop_map(|key| CacheOp::Delete { key }),
        1 => Just(CacheOp::RemoveAll),
        3 => (1u64..8).prop_map(|secs| CacheOp::Advance { secs }),
        2 => Just(CacheOp::Reap),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Insert accounting: n distinct puts raise occupancy by exactly n.
    #[test]
    fn prop_insert_accounting(
        keys in prop::collection::hash_set(valid_key_strategy(), 0..200),
        preloaded in 0usize..20
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let store = new_store();
            for i in 0..preloaded {
                store.put(format!("pre-{}", i), "v".to_string(), TTL).await.unwrap();
            }

            let before = store.metrics().count();
            for key in &keys {
                store.put(key.clone(), "v".to_string(), TTL).await.unwrap();
            }

            prop_assert_eq!(store.metrics().count() - before, keys.len() as u64);
            Ok(())
        })?;
    }

    // Occupancy always equals the number of stored entries, and after a reap
    // it equals the number of keys a model says are still live.
    #[test]
    fn prop_accounting_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let rt = paused_runtime();
        rt.block_on(async {
            let store = new_store();
            // key -> seconds since last touch
            let mut model: HashMap<String, u64> = HashMap::new();

            for op in ops {
                match op {
                    CacheOp::Put { key } => {
                        store.put(format!("k{}", key), "v".to_string(), TTL).await.unwrap();
                        model.insert(format!("k{}", key), 0);
                    }
                    CacheOp::Delete { key } => {
                        let removed = store.delete(&format!("k{}", key)).await.unwrap();
                        prop_assert_eq!(removed, model.remove(&format!("k{}", key)).is_some());
                    }
                    CacheOp::RemoveAll => {
                        store.remove_all().await.unwrap();
                        model.clear();
                    }
                    CacheOp::Advance { secs } => {
                        tokio::time::advance(Duration::from_secs(secs)).await;
                        for age in model.values_mut() {
                            *age += secs;
                        }
                    }
                    CacheOp::Reap => {
                        reap(&store).await;
                        model.retain(|_, age| *age < TTL_SECS);
                        prop_assert_eq!(store.metrics().count(), model.len() as u64);
                    }
                }

                prop_assert_eq!(store.metrics().count(), store.len().await as u64);
                prop_assert_eq!(store.metrics().count(), model.len() as u64);
            }
            Ok(())
        })?;
    }

    // Overwrite keeps one entry and returns the latest value.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let store = new_store();
            store.put(key.clone(), value1, TTL).await.unwrap();
            store.put(key.clone(), value2.clone(), TTL).await.unwrap();

            prop_assert_eq!(store.get(&key, false).await.unwrap(), value2);
            prop_assert_eq!(store.metrics().count(), 1);
            Ok(())
        })?;
    }

    // No premature eviction: nothing goes before last touch + TTL.
    #[test]
    fn prop_no_premature_eviction(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..50),
        elapsed_ms in 0u64..(TTL_SECS * 1000)
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let store = new_store();
            for key in &keys {
                store.put(key.clone(), "v".to_string(), TTL).await.unwrap();
            }

            tokio::time::advance(Duration::from_millis(elapsed_ms)).await;

            prop_assert_eq!(reap(&store).await, 0);
            prop_assert_eq!(store.metrics().count(), keys.len() as u64);
            for key in &keys {
                prop_assert!(store.get(key, false).await.is_ok());
            }
            Ok(())
        })?;
    }

    // Touch resets TTL: a re-put near expiry moves the deadline to now + TTL.
    #[test]
    fn prop_touch_resets_ttl(
        key in valid_key_strategy(),
        first_wait in 1u64..TTL_SECS,
        second_wait in 1u64..TTL_SECS
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let store = new_store();
            store.put(key.clone(), "v1".to_string(), TTL).await.unwrap();

            tokio::time::advance(Duration::from_secs(first_wait)).await;
            store.put(key.clone(), "v2".to_string(), TTL).await.unwrap();
            tokio::time::advance(Duration::from_secs(second_wait)).await;

            reap(&store).await;
            prop_assert_eq!(store.get(&key, false).await.unwrap(), "v2".to_string());

            tokio::time::advance(Duration::from_secs(TTL_SECS - second_wait)).await;
            prop_assert_eq!(reap(&store).await, 1);
            prop_assert_eq!(store.metrics().count(), 0);
            Ok(())
        })?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // No double decrement: concurrent evictions of the same keys remove each
    // key once and leave only the live entries counted.
    #[test]
    fn prop_concurrent_eviction_decrements_once(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..100),
        extra in 0usize..10
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = new_store();
            let short = Duration::from_millis(5);
            for key in &keys {
                store.put(key.clone(), "v".to_string(), short).await.unwrap();
            }
            for i in 0..extra {
                store.put(format!("live-{}", i), "v".to_string(), TTL).await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;

            let batch: Vec<String> = keys.iter().cloned().collect();
            let tasks: Vec<_> = (0..4)
                .map(|_| {
                    let store = store.clone();
                    let batch = batch.clone();
                    tokio::spawn(async move { store.evict_expired(&batch).await.unwrap() })
                })
                .collect();

            let mut total = 0;
            for task in tasks {
                total += task.await.unwrap();
            }

            prop_assert_eq!(total, keys.len() as u64);
            prop_assert_eq!(store.metrics().count(), extra as u64);
            prop_assert_eq!(store.metrics().snapshot().expirations, keys.len() as u64);
            Ok(())
        })?;
    }

    // Idempotent removeAll: clearing twice leaves zero and never errors.
    #[test]
    fn prop_remove_all_idempotent(keys in prop::collection::hash_set(valid_key_strategy(), 0..50)) {
        let rt = paused_runtime();
        rt.block_on(async {
            let store = new_store();
            for key in &keys {
                store.put(key.clone(), "v".to_string(), TTL).await.unwrap();
            }

            prop_assert_eq!(store.remove_all().await.unwrap(), keys.len() as u64);
            prop_assert_eq!(store.remove_all().await.unwrap(), 0);
            prop_assert_eq!(store.metrics().count(), 0);
            prop_assert!(store.get("anything", false).await.is_err());
            Ok(())
        })?;
    }
}
