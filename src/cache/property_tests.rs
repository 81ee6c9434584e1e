//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against a simple reference LRU model.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::cache::BoundedExpiringCache;
use crate::config::CacheConfig;

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(300);

/// Background tasks are spawned onto this runtime but never driven, so
/// nothing expires while a case runs.
fn idle_runtime() -> Runtime {
    Builder::new_current_thread().enable_all().build().unwrap()
}

fn new_cache(runtime: &Runtime, max_size: usize) -> BoundedExpiringCache<String, String> {
    BoundedExpiringCache::with_handle(CacheConfig::new(TEST_TTL, max_size), runtime.handle().clone())
        .unwrap()
}

// == Strategies ==
/// Small key space so puts, gets and removes collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

// == Reference Model ==
/// Plain single-threaded LRU: front of `order` is the eviction candidate.
#[derive(Debug, Default)]
struct ModelLru {
    values: HashMap<String, String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ModelLru {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn move_to_back(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }

    fn put(&mut self, key: String, value: String) {
        if !self.values.contains_key(&key) && self.values.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.values.remove(&oldest);
            }
        }
        self.move_to_back(&key);
        self.values.insert(key, value);
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let value = self.values.get(key).cloned()?;
        self.move_to_back(key);
        Some(value)
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
        self.order.retain(|k| k != key);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Every operation agrees with the model, including which key gets evicted.
    #[test]
    fn prop_matches_reference_lru(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let runtime = idle_runtime();
        let cache = new_cache(&runtime, capacity);
        let mut model = ModelLru::new(capacity);

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    cache.put(key.clone(), value.clone());
                    model.put(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(&key), "get({}) diverged", key);
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                    model.remove(&key);
                }
            }
        }

        let expected: Vec<String> = model.order.iter().cloned().collect();
        prop_assert_eq!(cache.keys_by_recency(), expected);
    }

    // The number of resident keys never exceeds max_size.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..20,
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200)
    ) {
        let runtime = idle_runtime();
        let cache = new_cache(&runtime, capacity);

        for (key, value) in entries {
            cache.put(key, value);
            prop_assert!(
                cache.size() <= capacity,
                "Cache size {} exceeds max {}",
                cache.size(),
                capacity
            );
        }
    }

    // The recency index and the table always hold the same key set, each key once.
    #[test]
    fn prop_recency_index_consistency(
        capacity in 1usize..8,
        ops in prop::collection::vec(cache_op_strategy(), 1..100)
    ) {
        let runtime = idle_runtime();
        let cache = new_cache(&runtime, capacity);

        for op in ops {
            match op {
                CacheOp::Put { key, value } => cache.put(key, value),
                CacheOp::Get { key } => {
                    let _ = cache.get(&key);
                }
                CacheOp::Remove { key } => cache.remove(&key),
            }

            let recency = cache.keys_by_recency();
            let index: HashSet<String> = recency.iter().cloned().collect();
            let table: HashSet<String> = cache.keys().into_iter().collect();
            prop_assert_eq!(recency.len(), index.len(), "Duplicate key in recency index");
            prop_assert_eq!(index, table);
        }
    }

    // Hit and miss counters match the observed get results.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let runtime = idle_runtime();
        let cache = new_cache(&runtime, 4);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => cache.put(key, value),
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => cache.remove(&key),
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, cache.len(), "Total entries mismatch");
        prop_assert_eq!(stats.expirations, 0);
    }

    // Removing an absent key leaves contents and order untouched.
    #[test]
    fn prop_remove_absent_is_noop(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 0..20),
        absent in "[x-z]{1,3}"
    ) {
        let runtime = idle_runtime();
        let cache = new_cache(&runtime, 8);
        for (key, value) in entries {
            cache.put(key, value);
        }

        let before = cache.keys_by_recency();
        cache.remove(&absent);

        prop_assert_eq!(cache.keys_by_recency(), before);
    }
}
