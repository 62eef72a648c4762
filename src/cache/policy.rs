//! Eviction Policy Module
//!
//! The active strategy, chosen once at construction. Each variant decides
//! which entry leaves when the cache is full and how reads and writes update
//! the entry metadata.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::CacheEntry;

// == Policy ==
/// Eviction/expiration strategy of a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Evicts the least recently used entry.
    Lru { capacity: NonZeroUsize },
    /// Evicts the least frequently read entry; ties go to the oldest insertion.
    Lfu { capacity: NonZeroUsize },
    /// Evicts the entry inserted or read longest ago. Reads refresh the
    /// timestamp, so read entries move to the back of the queue.
    Fifo { capacity: NonZeroUsize },
    /// No capacity bound; entries are dropped `max_age` after insertion.
    Expire { max_age: Duration },
}

impl Policy {
    /// Discriminator as used in configuration documents.
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Lru { .. } => "LRU",
            Policy::Lfu { .. } => "LFU",
            Policy::Fifo { .. } => "FIFO",
            Policy::Expire { .. } => "EXPIRE",
        }
    }

    /// Capacity bound, absent for EXPIRE.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        match *self {
            Policy::Lru { capacity } | Policy::Lfu { capacity } | Policy::Fifo { capacity } => {
                Some(capacity)
            }
            Policy::Expire { .. } => None,
        }
    }

    /// Entry lifetime, present only for EXPIRE.
    pub fn max_age(&self) -> Option<Duration> {
        match *self {
            Policy::Expire { max_age } => Some(max_age),
            _ => None,
        }
    }

    // == Victim Selection ==
    /// Picks the entry to evict before an insert, or None while there is room.
    ///
    /// Keys are unique, so every ordering below is total and the choice does
    /// not depend on map iteration order.
    pub(crate) fn select_victim<V>(&self, entries: &HashMap<String, CacheEntry<V>>) -> Option<String> {
        let capacity = self.capacity()?;
        if entries.len() < capacity.get() {
            return None;
        }

        let victim = match self {
            Policy::Lru { .. } => entries.iter().max_by_key(|(_, entry)| entry.recency_rank),
            Policy::Lfu { .. } => entries
                .iter()
                .min_by_key(|(_, entry)| (entry.access_frequency, entry.sequence)),
            Policy::Fifo { .. } => entries.iter().min_by_key(|(_, entry)| entry.fifo_key()),
            Policy::Expire { .. } => None,
        };

        victim.map(|(key, _)| key.clone())
    }

    // == Insert ==
    /// Prepares the live entries and the new entry for an insert.
    ///
    /// Called after any eviction and before `entry` is added to the map.
    pub(crate) fn on_insert<V>(
        &self,
        entries: &mut HashMap<String, CacheEntry<V>>,
        entry: &mut CacheEntry<V>,
        now: DateTime<Utc>,
    ) {
        match self {
            Policy::Lru { .. } => {
                for existing in entries.values_mut() {
                    existing.recency_rank += 1;
                }
                entry.recency_rank = 0;
            }
            Policy::Lfu { .. } => entry.access_frequency = 0,
            Policy::Fifo { .. } => entry.inserted_at = now,
            Policy::Expire { max_age } => {
                entry.expires_at = Some(deadline(now, *max_age));
            }
        }
    }

    // == Access ==
    /// Applies the read-side mutation for a successful lookup of `key`.
    pub(crate) fn on_access<V>(
        &self,
        entries: &mut HashMap<String, CacheEntry<V>>,
        key: &str,
        now: DateTime<Utc>,
        sequence: u64,
    ) {
        match self {
            Policy::Lru { .. } => {
                let Some(rank) = entries.get(key).map(|entry| entry.recency_rank) else {
                    return;
                };
                // Only entries fresher than the accessed one age, which keeps
                // the ranks a permutation of 0..n
                for (other_key, other) in entries.iter_mut() {
                    if other_key == key {
                        other.recency_rank = 0;
                    } else if other.recency_rank < rank {
                        other.recency_rank += 1;
                    }
                }
            }
            Policy::Lfu { .. } => {
                if let Some(entry) = entries.get_mut(key) {
                    entry.access_frequency += 1;
                }
            }
            Policy::Fifo { .. } => {
                if let Some(entry) = entries.get_mut(key) {
                    entry.inserted_at = now;
                    entry.sequence = sequence;
                }
            }
            Policy::Expire { .. } => {}
        }
    }

    // == Removal ==
    /// Repairs the remaining entries after `removed` left the map.
    pub(crate) fn on_remove<V>(
        &self,
        entries: &mut HashMap<String, CacheEntry<V>>,
        removed: &CacheEntry<V>,
    ) {
        if let Policy::Lru { .. } = self {
            for entry in entries.values_mut() {
                if entry.recency_rank > removed.recency_rank {
                    entry.recency_rank -= 1;
                }
            }
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Expire { max_age } => write!(f, "EXPIRE(maxAge={}ms)", max_age.as_millis()),
            other => match other.capacity() {
                Some(capacity) => write!(f, "{}(max={})", other.name(), capacity),
                None => f.write_str(other.name()),
            },
        }
    }
}

fn deadline(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| now.checked_add_signed(age))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
