//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

use crate::cache::EvictionOrder;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Which entry is evicted first when the cache is full
    pub eviction_order: EvictionOrder,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `EVICTION_ORDER` - `insertion` or `access` (default: insertion)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_env_or(Self::default())
    }

    /// Like [`from_env`](Self::from_env), with caller-chosen fallbacks.
    pub fn from_env_or(defaults: CacheConfig) -> Self {
        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            eviction_order: env::var("EVICTION_ORDER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.eviction_order),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            eviction_order: EvictionOrder::Insertion,
        }
    }
}
