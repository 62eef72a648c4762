//! Cache Store Module
//!
//! `PolicyCache`: the entry map, the active [`Policy`], and for EXPIRE the
//! pending deletion timers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::timers::{self, ExpiryTimer};
use crate::cache::{CacheEntry, CacheStats, KeyGenerator, Policy, UuidKeys};
use crate::config::{CacheOptions, DEFAULT_CAPACITY};
use crate::error::Result;

// == Shared State ==
/// Everything the expiry timers may mutate alongside callers.
#[derive(Debug)]
struct State<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// EXPIRE only: one timer per live entry
    timers: HashMap<String, ExpiryTimer>,
    stats: CacheStats,
    /// Logical clock for insertion/refresh stamps
    clock: u64,
}

impl<V> State<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            timers: HashMap::new(),
            stats: CacheStats::new(),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Removes `key` and its timer. Absent keys are a no-op.
    fn remove_entry(&mut self, policy: &Policy, key: &str) -> Option<CacheEntry<V>> {
        if let Some(timer) = self.timers.remove(key) {
            timer.cancel();
        }
        let removed = self.entries.remove(key)?;
        policy.on_remove(&mut self.entries, &removed);
        Some(removed)
    }

    /// Lazy expiry: drops `key` if its deadline has passed.
    fn purge_if_expired(&mut self, policy: &Policy, key: &str, now: DateTime<Utc>) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));

        if expired {
            self.remove_entry(policy, key);
            self.stats.record_expiration();
            debug!("Lazily expired entry {}", key);
        }
        expired
    }

    fn sweep_expired(&mut self, policy: &Policy, now: DateTime<Utc>) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.purge_if_expired(policy, key, now);
        }
        expired_keys.len()
    }

    /// Eager expiry, run by the timer scheduled with `timer_id`.
    ///
    /// Does nothing unless that timer is still the one registered for `key`.
    fn expire_from_timer(&mut self, key: &str, timer_id: u64) {
        let registered = self.timers.get(key).map(|timer| timer.id);
        if registered != Some(timer_id) {
            return;
        }

        self.timers.remove(key);
        if self.entries.remove(key).is_some() {
            self.stats.record_expiration();
            debug!("Timer {} expired entry {}", timer_id, key);
        }
    }

    fn cancel_timers(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.cancel();
        }
    }
}

// == Policy Cache ==
/// In-process key-value cache driven by one eviction/expiration [`Policy`].
///
/// Keys are generated by the cache and returned from [`PolicyCache::set`].
/// Under EXPIRE, entries are deleted by background timers when a tokio
/// runtime is available, and in any case never returned once stale.
pub struct PolicyCache<V> {
    policy: Policy,
    state: Arc<Mutex<State<V>>>,
    keys: Box<dyn KeyGenerator>,
}

impl<V> PolicyCache<V>
where
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Validates `options` and builds an empty cache.
    pub fn new(options: &CacheOptions) -> Result<Self> {
        let policy = options.validate()?;
        Ok(Self::from_policy(policy))
    }

    /// Builds an empty cache for an already validated policy.
    pub fn from_policy(policy: Policy) -> Self {
        info!("Policy cache initialized: {}", policy);
        Self {
            policy,
            state: Arc::new(Mutex::new(State::new())),
            keys: Box::new(UuidKeys),
        }
    }

    /// Replaces the key generator.
    pub fn with_key_generator(mut self, keys: impl KeyGenerator + 'static) -> Self {
        self.keys = Box::new(keys);
        self
    }

    /// The active policy.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    // == Set ==
    /// Stores `value` under a freshly generated key and returns the key.
    ///
    /// Under LRU/LFU/FIFO a full cache first evicts one entry chosen by the
    /// policy. Under EXPIRE the entry gets a deadline and a deletion timer.
    pub fn set(&self, value: V) -> String {
        let key = self.keys.generate();
        let now = Utc::now();
        let mut state = self.state.lock();

        // A generator repeating a live key replaces that entry
        state.remove_entry(&self.policy, &key);

        if let Some(victim) = self.policy.select_victim(&state.entries) {
            state.remove_entry(&self.policy, &victim);
            state.stats.record_eviction();
            debug!("Evicted entry {} under {}", victim, self.policy.name());
        }

        let sequence = state.tick();
        let mut entry = CacheEntry::new(value, now, sequence);
        self.policy.on_insert(&mut state.entries, &mut entry, now);
        state.entries.insert(key.clone(), entry);

        if let Some(max_age) = self.policy.max_age() {
            let weak = Arc::downgrade(&self.state);
            let timer_key = key.clone();
            let timer = timers::schedule(sequence, max_age, move || {
                expire_entry(&weak, &timer_key, sequence);
            });
            if let Some(timer) = timer {
                state.timers.insert(key.clone(), timer);
            }
        }

        key
    }

    // == Get ==
    /// Returns a copy of the value stored under `key`.
    ///
    /// Stale EXPIRE entries are deleted and reported as absent. A hit applies
    /// the policy's read-side update.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Utc::now();
        let mut state = self.state.lock();

        if state.purge_if_expired(&self.policy, key, now) || !state.entries.contains_key(key) {
            state.stats.record_miss();
            return None;
        }

        let sequence = state.tick();
        self.policy.on_access(&mut state.entries, key, now, sequence);
        state.stats.record_hit();
        state.entries.get(key).map(|entry| entry.content.clone())
    }

    // == Has ==
    /// True if `key` is present and not expired. Leaves policy metadata alone.
    pub fn has(&self, key: &str) -> bool {
        let now = Utc::now();
        let mut state = self.state.lock();

        !state.purge_if_expired(&self.policy, key, now) && state.entries.contains_key(key)
    }

    // == Remove ==
    /// Deletes `key` and cancels its timer. Absent keys are ignored.
    pub fn remove(&self, key: &str) {
        let mut state = self.state.lock();
        if state.remove_entry(&self.policy, key).is_some() {
            debug!("Removed entry {}", key);
        }
    }

    // == Clear ==
    /// Cancels every timer and resets the cache to its freshly built state.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.cancel_timers();
        *state = State::new();
        debug!("Cache cleared");
    }

    // == Size ==
    /// Number of live entries. EXPIRE sweeps stale entries first.
    pub fn size(&self) -> usize {
        let mut state = self.state.lock();
        self.sweep_if_expiring(&mut state);
        state.entries.len()
    }

    /// True if [`PolicyCache::size`] is zero.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // == Inspect ==
    /// Point-in-time copy of every entry, ordered by key.
    ///
    /// Performs no expiry sweep and no policy update.
    pub fn inspect(&self) -> BTreeMap<String, CacheEntry<V>> {
        let state = self.state.lock();
        state
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    ///
    /// `total_entries` agrees with [`PolicyCache::size`], so EXPIRE sweeps
    /// stale entries first.
    pub fn stats(&self) -> CacheStats {
        let mut state = self.state.lock();
        self.sweep_if_expiring(&mut state);
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    fn sweep_if_expiring(&self, state: &mut State<V>) {
        if let Policy::Expire { .. } = self.policy {
            let removed = state.sweep_expired(&self.policy, Utc::now());
            if removed > 0 {
                debug!("Sweep removed {} expired entries", removed);
            }
        }
    }
}

impl<V> Default for PolicyCache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::from_policy(Policy::Lru {
            capacity: DEFAULT_CAPACITY,
        })
    }
}

impl<V> fmt::Debug for PolicyCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyCache")
            .field("policy", &self.policy)
            .field("entries", &self.state.lock().entries.len())
            .finish()
    }
}

impl<V> Drop for PolicyCache<V> {
    fn drop(&mut self) {
        self.state.lock().cancel_timers();
    }
}

/// Timer callback. The cache may already be gone.
fn expire_entry<V>(state: &Weak<Mutex<State<V>>>, key: &str, timer_id: u64) {
    if let Some(state) = state.upgrade() {
        state.lock().expire_from_timer(key, timer_id);
    }
}
