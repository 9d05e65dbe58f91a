//! Error types for the loading cache
//!
//! Provides unified error handling using thiserror.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error produced by a [`CacheLoader`](crate::cache::CacheLoader).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// == Cache Error Enum ==
/// Unified error type returned by cache operations.
///
/// Cloneable so that every caller coalesced on the same in-flight load
/// receives the identical outcome.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Capacity must be at least one entry
    #[error("Invalid capacity: {0} (must be greater than 0)")]
    InvalidCapacity(usize),

    /// The loader failed to produce a value
    #[error("Failed to load key {key}: {source}")]
    Load {
        /// Debug rendering of the key that triggered the load
        key: String,
        /// Failure reported by the loader
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// The caller's cancellation signal fired while waiting on a load
    #[error("Load cancelled for key: {0}")]
    Cancelled(String),

    /// The in-flight load ended without producing a result
    #[error("Load abandoned for key: {0}")]
    LoadAbandoned(String),
}

impl CacheError {
    // == Load Error ==
    /// Wraps a loader failure, keeping the key for diagnostics.
    pub fn load<K: std::fmt::Debug>(key: &K, source: BoxError) -> Self {
        CacheError::Load {
            key: format!("{key:?}"),
            source: Arc::from(source),
        }
    }

    /// Returns true if this error came from the loader itself.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, CacheError::Load { .. })
    }
}

// == Listener Error Enum ==
/// Failure raised by a removal listener.
///
/// Never returned to the caller whose operation triggered the removal; it is
/// logged and handed to the cache's listener-error handler instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// The listener reported a failure
    #[error("Removal listener failed: {0}")]
    Failed(String),

    /// The listener panicked
    #[error("Removal listener panicked: {0}")]
    Panicked(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_carries_key() {
        let err = CacheError::load(&"user:1", "backend down".into());

        assert!(err.is_load_failure());
        let message = err.to_string();
        assert!(message.contains("\"user:1\""));
        assert!(message.contains("backend down"));
    }

    #[test]
    fn test_load_error_clone_shares_source() {
        let err = CacheError::load(&7u32, "boom".into());
        let cloned = err.clone();

        match (&err, &cloned) {
            (CacheError::Load { source: a, .. }, CacheError::Load { source: b, .. }) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected load errors"),
        }
    }

    #[test]
    fn test_invalid_capacity_message() {
        let err = CacheError::InvalidCapacity(0);
        assert!(!err.is_load_failure());
        assert_eq!(err.to_string(), "Invalid capacity: 0 (must be greater than 0)");
    }
}
