//! Policy Cache - an in-process key-value cache
//!
//! Stores opaque values under generated keys and keeps the entry count or
//! entry age bounded with one of four policies: LRU, LFU, FIFO or EXPIRE.
//!
//! ```
//! use policy_cache::{CacheOptions, PolicyCache};
//!
//! let cache = PolicyCache::new(&CacheOptions::lru(2)).unwrap();
//! let first = cache.set("first");
//! cache.set("second");
//! cache.set("third");
//!
//! assert_eq!(cache.get(&first), None);
//! assert_eq!(cache.size(), 2);
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, CacheStats, KeyGenerator, Policy, PolicyCache, UuidKeys};
pub use config::CacheOptions;
pub use error::ConfigError;
