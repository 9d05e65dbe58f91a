//! Cache Module
//!
//! Provides a bounded loading cache with coalesced loads, pluggable
//! eviction order, and removal notifications.

mod builder;
mod entry;
mod inflight;
mod listener;
mod loader;
mod loading;
mod notifier;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use builder::CacheBuilder;
pub use entry::CacheEntry;
pub use listener::{FnListener, RemovalCause, RemovalListener, RemovalNotification};
pub use loader::{CacheLoader, FnLoader};
pub use loading::LoadingCache;
pub use notifier::ListenerErrorHandler;
pub use policy::{EvictionOrder, EvictionPolicy, FifoPolicy, LruPolicy};
pub use stats::CacheStats;
pub use store::EntryStore;
