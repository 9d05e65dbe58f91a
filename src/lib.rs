//! Load Cache - A bounded, concurrent loading cache
//!
//! Computes values on demand, coalesces concurrent loads of the same key,
//! evicts by insertion or access order, and reports every removal with its
//! cause.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheBuilder, LoadingCache, RemovalCause, RemovalNotification};
pub use config::CacheConfig;
pub use error::{BoxError, CacheError, ListenerError, Result};
