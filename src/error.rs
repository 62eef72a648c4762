//! Error types for the policy cache
//!
//! Only construction can fail. Runtime lookups report absence with `None`.

use thiserror::Error;

// == Config Error Enum ==
/// Reasons a cache configuration is rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The `type` discriminator names no known policy
    #[error("Unknown cache policy: {0}")]
    UnknownPolicy(String),

    /// LRU/LFU/FIFO configured without `max`
    #[error("Policy {0} requires a capacity (max)")]
    MissingCapacity(String),

    /// `max` was zero
    #[error("Capacity must be positive for policy {0}")]
    ZeroCapacity(String),

    /// `maxAge` supplied to a capacity-bounded policy
    #[error("Policy {0} does not accept maxAge")]
    UnexpectedMaxAge(String),

    /// EXPIRE configured without `maxAge`
    #[error("Policy EXPIRE requires a maxAge in milliseconds")]
    MissingMaxAge,

    /// `maxAge` was zero
    #[error("maxAge must be a positive number of milliseconds")]
    ZeroMaxAge,

    /// `max` supplied to EXPIRE
    #[error("Policy EXPIRE does not accept max")]
    UnexpectedCapacity,

    /// The configuration document could not be parsed
    #[error("Invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for cache construction.
pub type Result<T> = std::result::Result<T, ConfigError>;
