//! Cache Builder Module
//!
//! Fluent construction of a [`LoadingCache`].

use std::fmt::Debug;
use std::hash::Hash;

use crate::cache::notifier::{ListenerErrorHandler, Notifier};
use crate::cache::{
    CacheLoader, EvictionOrder, FnListener, FnLoader, LoadingCache, RemovalListener,
    RemovalNotification,
};
use crate::config::CacheConfig;
use crate::error::{BoxError, CacheError, ListenerError, Result};

/// Builder for configuring and constructing a [`LoadingCache`].
///
/// # Example
/// ```
/// use loadcache::cache::{CacheBuilder, EvictionOrder};
///
/// let cache = CacheBuilder::new(1_000)
///     .eviction_order(EvictionOrder::Access)
///     .build_with(|key: &String| Ok::<_, loadcache::BoxError>(key.to_uppercase()))
///     .unwrap();
///
/// assert_eq!(cache.capacity(), 1_000);
/// ```
pub struct CacheBuilder<K, V> {
    capacity: usize,
    eviction_order: EvictionOrder,
    listener: Option<Box<dyn RemovalListener<K, V>>>,
    error_handler: Option<ListenerErrorHandler>,
}

impl<K: 'static, V: 'static> CacheBuilder<K, V> {
    /// Starts a builder for a cache holding at most `capacity` entries.
    ///
    /// A zero capacity is rejected when the cache is built.
    pub fn new(capacity: usize) -> Self {
        CacheBuilder {
            capacity,
            eviction_order: EvictionOrder::default(),
            listener: None,
            error_handler: None,
        }
    }

    /// Starts a builder from loaded configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity).eviction_order(config.eviction_order)
    }

    /// Choose insertion-order (default) or access-order eviction.
    pub fn eviction_order(mut self, order: EvictionOrder) -> Self {
        self.eviction_order = order;
        self
    }

    /// Register a removal listener closure.
    ///
    /// Called once per removal, after the cache lock is released, in the
    /// order the removals happened.
    pub fn removal_listener<F>(mut self, f: F) -> Self
    where
        F: Fn(RemovalNotification<K, V>) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(FnListener(f)));
        self
    }

    /// Register a removal listener via the [`RemovalListener`] trait.
    pub fn removal_listener_impl<L: RemovalListener<K, V>>(mut self, listener: L) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Receive failures raised by the removal listener.
    ///
    /// Without a handler, listener failures are only logged.
    pub fn listener_error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&ListenerError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Box::new(f));
        self
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds the cache around `loader`.
    ///
    /// Fails with [`CacheError::InvalidCapacity`] if the capacity is zero.
    pub fn build<L: CacheLoader<K, V>>(self, loader: L) -> Result<LoadingCache<K, V>> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidCapacity(self.capacity));
        }
        let notifier = Notifier::new(self.listener, self.error_handler);
        Ok(LoadingCache::from_parts(
            self.capacity,
            self.eviction_order,
            Box::new(loader),
            notifier,
        ))
    }

    /// Builds the cache around a loader closure.
    pub fn build_with<F>(self, f: F) -> Result<LoadingCache<K, V>>
    where
        F: Fn(&K) -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        self.build(FnLoader(f))
    }
}
