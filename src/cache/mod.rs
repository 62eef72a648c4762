//! Cache Module
//!
//! Policy-driven key-value storage with LRU, LFU, FIFO and EXPIRE strategies.

mod entry;
mod keys;
mod policy;
mod stats;
mod store;
mod timers;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use keys::{KeyGenerator, UuidKeys};
pub use policy::Policy;
pub use stats::CacheStats;
pub use store::PolicyCache;
