//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check each policy against a simple reference model.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::cache::PolicyCache;
use crate::config::CacheOptions;

// == Test Configuration ==
const TEST_CAPACITY: usize = 5;

/// A cache operation. Key-taking operations pick one of the keys issued so
/// far by index, wrapping around.
#[derive(Debug, Clone)]
enum CacheOp {
    Set,
    Get(usize),
    Has(usize),
    Remove(usize),
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => Just(CacheOp::Set),
        3 => any::<usize>().prop_map(CacheOp::Get),
        1 => any::<usize>().prop_map(CacheOp::Has),
        1 => any::<usize>().prop_map(CacheOp::Remove),
        1 => Just(CacheOp::Clear),
    ]
}

fn pick(issued: &[String], index: usize) -> Option<&String> {
    if issued.is_empty() {
        None
    } else {
        issued.get(index % issued.len())
    }
}

fn live_keys(cache: &PolicyCache<usize>) -> HashSet<String> {
    cache.inspect().into_keys().collect()
}

// == Reference Models ==
/// Recency queue: front = next victim. Serves LRU, and FIFO, whose reads
/// requeue the entry at the back.
#[derive(Default)]
struct QueueModel {
    order: VecDeque<String>,
}

impl QueueModel {
    fn insert(&mut self, key: String) -> Option<String> {
        let victim = if self.order.len() >= TEST_CAPACITY {
            self.order.pop_front()
        } else {
            None
        };
        self.order.push_back(key);
        victim
    }

    fn touch(&mut self, key: &str) {
        if let Some(position) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(position) {
                self.order.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    fn keys(&self) -> HashSet<String> {
        self.order.iter().cloned().collect()
    }
}

/// Frequency table with insertion order as the tie-break.
#[derive(Default)]
struct FrequencyModel {
    entries: HashMap<String, (u64, u64)>,
    inserted: u64,
}

impl FrequencyModel {
    fn insert(&mut self, key: String) {
        if self.entries.len() >= TEST_CAPACITY {
            let victim = self
                .entries
                .iter()
                .min_by_key(|(_, counters)| **counters)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }
        self.inserted += 1;
        self.entries.insert(key, (0, self.inserted));
    }

    fn touch(&mut self, key: &str) {
        if let Some(counters) = self.entries.get_mut(key) {
            counters.0 += 1;
        }
    }

    fn keys(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }
}

fn run_queue_model(options: CacheOptions, ops: Vec<CacheOp>) -> std::result::Result<(), TestCaseError> {
    let cache: PolicyCache<usize> = PolicyCache::new(&options).unwrap();
    let mut model = QueueModel::default();
    let mut issued: Vec<String> = Vec::new();

    for (i, op) in ops.into_iter().enumerate() {
        match op {
            CacheOp::Set => {
                let key = cache.set(i);
                model.insert(key.clone());
                issued.push(key);
            }
            CacheOp::Get(index) => {
                if let Some(key) = pick(&issued, index) {
                    let hit = cache.get(key).is_some();
                    prop_assert_eq!(hit, model.order.contains(key));
                    model.touch(key);
                }
            }
            CacheOp::Has(index) => {
                if let Some(key) = pick(&issued, index) {
                    prop_assert_eq!(cache.has(key), model.order.contains(key));
                }
            }
            CacheOp::Remove(index) => {
                if let Some(key) = pick(&issued, index) {
                    cache.remove(key);
                    model.remove(key);
                }
            }
            CacheOp::Clear => {
                cache.clear();
                model.order.clear();
            }
        }

        prop_assert_eq!(live_keys(&cache), model.keys());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Capacity is never exceeded under any bounded policy
    #[test]
    fn prop_capacity_enforcement(
        ops in prop::collection::vec(cache_op_strategy(), 1..100),
        policy in prop_oneof![Just("LRU"), Just("LFU"), Just("FIFO")]
    ) {
        let options = CacheOptions {
            policy: policy.to_string(),
            max: Some(TEST_CAPACITY),
            max_age: None,
        };
        let cache: PolicyCache<usize> = PolicyCache::new(&options).unwrap();
        let mut issued: Vec<String> = Vec::new();

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                CacheOp::Set => issued.push(cache.set(i)),
                CacheOp::Get(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.get(key);
                    }
                }
                CacheOp::Has(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.has(key);
                    }
                }
                CacheOp::Remove(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.remove(key);
                    }
                }
                CacheOp::Clear => cache.clear(),
            }

            prop_assert!(
                cache.size() <= TEST_CAPACITY,
                "Cache size {} exceeds max {}",
                cache.size(),
                TEST_CAPACITY
            );
        }
    }

    // Recency ranks are always exactly {0, .., n-1}
    #[test]
    fn prop_lru_ranks_form_permutation(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let cache: PolicyCache<usize> = PolicyCache::new(&CacheOptions::lru(TEST_CAPACITY)).unwrap();
        let mut issued: Vec<String> = Vec::new();

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                CacheOp::Set => issued.push(cache.set(i)),
                CacheOp::Get(index) | CacheOp::Has(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.get(key);
                    }
                }
                CacheOp::Remove(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.remove(key);
                    }
                }
                CacheOp::Clear => cache.clear(),
            }

            let mut ranks: Vec<usize> = cache.inspect().values().map(|e| e.recency_rank).collect();
            ranks.sort_unstable();
            let expected: Vec<usize> = (0..ranks.len()).collect();
            prop_assert_eq!(ranks, expected);
        }
    }

    // LRU keeps exactly the entries a recency queue would keep
    #[test]
    fn prop_lru_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        run_queue_model(CacheOptions::lru(TEST_CAPACITY), ops)?;
    }

    // FIFO with read refresh behaves like the same queue
    #[test]
    fn prop_fifo_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        run_queue_model(CacheOptions::fifo(TEST_CAPACITY), ops)?;
    }

    // LFU evicts the least read entry, oldest insertion first on ties
    #[test]
    fn prop_lfu_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let cache: PolicyCache<usize> = PolicyCache::new(&CacheOptions::lfu(TEST_CAPACITY)).unwrap();
        let mut model = FrequencyModel::default();
        let mut issued: Vec<String> = Vec::new();

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                CacheOp::Set => {
                    let key = cache.set(i);
                    model.insert(key.clone());
                    issued.push(key);
                }
                CacheOp::Get(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.get(key);
                        model.touch(key);
                    }
                }
                CacheOp::Has(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.has(key);
                    }
                }
                CacheOp::Remove(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.remove(key);
                        model.entries.remove(key);
                    }
                }
                CacheOp::Clear => {
                    cache.clear();
                    model.entries.clear();
                }
            }

            prop_assert_eq!(live_keys(&cache), model.keys());
        }
    }

    // Under EXPIRE, stats() reports the same count as size(), stale or not
    #[test]
    fn prop_expire_stats_match_size(sets in 1usize..20, removals in prop::collection::vec(any::<usize>(), 0..5)) {
        let cache: PolicyCache<usize> = PolicyCache::new(&CacheOptions::expire(60_000)).unwrap();
        let issued: Vec<String> = (0..sets).map(|i| cache.set(i)).collect();

        for index in removals {
            if let Some(key) = pick(&issued, index) {
                cache.remove(key);
            }
        }

        prop_assert_eq!(cache.stats().total_entries, cache.size());
    }

    // Hit and miss counters follow get() results; has() is not counted
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let cache: PolicyCache<usize> = PolicyCache::new(&CacheOptions::lfu(TEST_CAPACITY)).unwrap();
        let mut issued: Vec<String> = Vec::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                CacheOp::Set => issued.push(cache.set(i)),
                CacheOp::Get(index) => {
                    let key = pick(&issued, index).cloned().unwrap_or_default();
                    match cache.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Has(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.has(key);
                    }
                }
                CacheOp::Remove(index) => {
                    if let Some(key) = pick(&issued, index) {
                        cache.remove(key);
                    }
                }
                CacheOp::Clear => {
                    cache.clear();
                    expected_hits = 0;
                    expected_misses = 0;
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, cache.size(), "Total entries mismatch");
    }
}
