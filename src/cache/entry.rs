//! Cache Entry Module
//!
//! One record per live key, carrying the bookkeeping every policy reads.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Entry ==
/// A stored value plus the metadata the eviction policies order by.
///
/// Every field is initialised at creation; the active policy decides which
/// of them it reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    /// The stored value, never inspected by the cache
    pub content: V,
    /// Absolute deadline, set only under EXPIRE
    pub expires_at: Option<DateTime<Utc>>,
    /// LRU position, 0 = most recently used
    pub recency_rank: usize,
    /// LFU counter of successful reads
    pub access_frequency: u64,
    /// Creation time, refreshed on every read under FIFO
    pub inserted_at: DateTime<Utc>,
    /// Logical clock stamp taken together with `inserted_at`
    pub sequence: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a fresh entry stamped with `now`.
    pub fn new(content: V, now: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            content,
            expires_at: None,
            recency_rank: 0,
            access_frequency: 0,
            inserted_at: now,
            sequence,
        }
    }

    // == Is Expired ==
    /// Checks the deadline against `now`.
    ///
    /// An entry is stale only once `now` is strictly past `expires_at`;
    /// entries without a deadline never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// FIFO ordering key. Uses the logical stamp, which moves in step with
    /// `inserted_at` but never goes backwards.
    pub(crate) fn fifo_key(&self) -> u64 {
        self.sequence
    }
}
