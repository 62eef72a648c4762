//! Configuration Module
//!
//! Raw cache options as supplied by the host, and their validation into a
//! [`Policy`].

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::Policy;
use crate::error::{ConfigError, Result};

/// Capacity used when no configuration is supplied.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(capacity) => capacity,
    None => panic!("default capacity must be positive"),
};

/// Cache configuration before validation.
///
/// Mirrors the JSON shape `{"type": "LRU", "max": 10}` or
/// `{"type": "EXPIRE", "maxAge": 500}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOptions {
    /// Policy discriminator: LRU, LFU, FIFO or EXPIRE
    #[serde(rename = "type")]
    pub policy: String,
    /// Capacity bound for LRU/LFU/FIFO
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
    /// Entry lifetime in milliseconds for EXPIRE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

impl CacheOptions {
    /// Capacity-bounded LRU options.
    pub fn lru(max: usize) -> Self {
        Self::bounded("LRU", max)
    }

    /// Capacity-bounded LFU options.
    pub fn lfu(max: usize) -> Self {
        Self::bounded("LFU", max)
    }

    /// Capacity-bounded FIFO options.
    pub fn fifo(max: usize) -> Self {
        Self::bounded("FIFO", max)
    }

    /// Time-bounded EXPIRE options, `max_age_ms` in milliseconds.
    pub fn expire(max_age_ms: u64) -> Self {
        Self {
            policy: "EXPIRE".to_string(),
            max: None,
            max_age: Some(max_age_ms),
        }
    }

    fn bounded(policy: &str, max: usize) -> Self {
        Self {
            policy: policy.to_string(),
            max: Some(max),
            max_age: None,
        }
    }

    /// Parses options from a JSON document.
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Loads options from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_POLICY` - LRU, LFU, FIFO or EXPIRE (default: LRU)
    /// - `CACHE_MAX` - capacity for bounded policies (default: 10 when the policy is defaulted)
    /// - `CACHE_MAX_AGE_MS` - entry lifetime for EXPIRE
    pub fn from_env() -> Self {
        let policy = env::var("CACHE_POLICY").ok();
        let max = parse_env("CACHE_MAX");
        let max_age = parse_env("CACHE_MAX_AGE_MS");

        match policy {
            Some(policy) => Self {
                policy,
                max,
                max_age,
            },
            None => Self {
                max: max.or(Some(DEFAULT_CAPACITY.get())),
                max_age,
                ..Self::default()
            },
        }
    }

    /// Checks the discriminator against the fields it requires and builds
    /// the matching [`Policy`].
    pub fn validate(&self) -> Result<Policy> {
        let tag = self.policy.trim().to_ascii_uppercase();

        match tag.as_str() {
            "LRU" | "LFU" | "FIFO" => {
                if self.max_age.is_some() {
                    return Err(ConfigError::UnexpectedMaxAge(tag));
                }
                let max = self
                    .max
                    .ok_or_else(|| ConfigError::MissingCapacity(tag.clone()))?;
                let capacity =
                    NonZeroUsize::new(max).ok_or_else(|| ConfigError::ZeroCapacity(tag.clone()))?;

                Ok(match tag.as_str() {
                    "LRU" => Policy::Lru { capacity },
                    "LFU" => Policy::Lfu { capacity },
                    _ => Policy::Fifo { capacity },
                })
            }
            "EXPIRE" => {
                if self.max.is_some() {
                    return Err(ConfigError::UnexpectedCapacity);
                }
                match self.max_age {
                    None => Err(ConfigError::MissingMaxAge),
                    Some(0) => Err(ConfigError::ZeroMaxAge),
                    Some(ms) => Ok(Policy::Expire {
                        max_age: Duration::from_millis(ms),
                    }),
                }
            }
            _ => Err(ConfigError::UnknownPolicy(self.policy.clone())),
        }
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::lru(DEFAULT_CAPACITY.get())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}
