//! Removal listener: a callback invoked whenever an entry leaves the cache.
//!
//! # Example
//! ```
//! use loadcache::cache::{CacheBuilder, RemovalCause};
//! use std::sync::{Arc, Mutex};
//!
//! let log: Arc<Mutex<Vec<(String, RemovalCause)>>> = Arc::new(Mutex::new(Vec::new()));
//! let log2 = Arc::clone(&log);
//!
//! let cache = CacheBuilder::new(2)
//!     .removal_listener(move |n| log2.lock().unwrap().push((n.key, n.cause)))
//!     .build_with(|key: &String| Ok::<_, loadcache::BoxError>(key.len()))
//!     .unwrap();
//!
//! cache.put("a".to_string(), 1);
//! cache.put("b".to_string(), 2);
//! cache.put("c".to_string(), 3); // capacity eviction of "a"
//! cache.invalidate(&"b".to_string());
//!
//! assert_eq!(
//!     *log.lock().unwrap(),
//!     vec![("a".to_string(), RemovalCause::Size), ("b".to_string(), RemovalCause::Explicit)]
//! );
//! ```

use std::fmt;

use crate::error::ListenerError;

// == Removal Cause ==

/// The reason an entry was removed from the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalCause {
    /// Removed by [`LoadingCache::invalidate`] or
    /// [`LoadingCache::invalidate_all`].
    ///
    /// [`LoadingCache::invalidate`]: crate::cache::LoadingCache::invalidate
    /// [`LoadingCache::invalidate_all`]: crate::cache::LoadingCache::invalidate_all
    Explicit,
    /// Overwritten by a `put` or a successful refresh.
    Replaced,
    /// Evicted because inserting a new key would exceed capacity.
    Size,
    /// Dropped because refreshing the entry failed.
    Error,
}

impl RemovalCause {
    /// True only for capacity evictions.
    pub fn was_evicted(self) -> bool {
        matches!(self, RemovalCause::Size)
    }
}

impl fmt::Display for RemovalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemovalCause::Explicit => "EXPLICIT",
            RemovalCause::Replaced => "REPLACED",
            RemovalCause::Size => "SIZE",
            RemovalCause::Error => "ERROR",
        };
        f.write_str(name)
    }
}

// == Removal Notification ==

/// A removed entry together with the reason it was removed.
///
/// Built at the moment of removal and handed to the listener by value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovalNotification<K, V> {
    pub key: K,
    pub value: V,
    pub cause: RemovalCause,
}

impl<K, V> RemovalNotification<K, V> {
    pub fn new(key: K, value: V, cause: RemovalCause) -> Self {
        Self { key, value, cause }
    }

    /// True if the entry was evicted for capacity.
    pub fn was_evicted(&self) -> bool {
        self.cause.was_evicted()
    }
}

// == Removal Listener ==

/// A callback invoked exactly once for each physical removal.
///
/// Runs after the cache lock has been released, so it may call back into
/// the cache. Errors and panics are caught by the cache and never reach the
/// caller whose operation caused the removal.
pub trait RemovalListener<K, V>: Send + Sync + 'static {
    fn on_removal(&self, notification: RemovalNotification<K, V>) -> Result<(), ListenerError>;
}

/// A [`RemovalListener`] backed by an infallible closure.
///
/// Created via [`CacheBuilder::removal_listener`](crate::cache::CacheBuilder::removal_listener).
pub struct FnListener<F>(pub F);

impl<K, V, F> RemovalListener<K, V> for FnListener<F>
where
    F: Fn(RemovalNotification<K, V>) + Send + Sync + 'static,
{
    fn on_removal(&self, notification: RemovalNotification<K, V>) -> Result<(), ListenerError> {
        (self.0)(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_was_evicted_only_for_size() {
        assert!(RemovalCause::Size.was_evicted());
        assert!(!RemovalCause::Explicit.was_evicted());
        assert!(!RemovalCause::Replaced.was_evicted());
        assert!(!RemovalCause::Error.was_evicted());
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(RemovalCause::Size.to_string(), "SIZE");
        assert_eq!(RemovalCause::Explicit.to_string(), "EXPLICIT");
    }

    #[test]
    fn test_fn_listener_receives_notification() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = FnListener(move |n: RemovalNotification<u32, u32>| {
            sink.lock().unwrap().push((n.key, n.value, n.cause));
        });

        let result = listener.on_removal(RemovalNotification::new(1, 10, RemovalCause::Replaced));

        assert!(result.is_ok());
        assert_eq!(*seen.lock().unwrap(), vec![(1, 10, RemovalCause::Replaced)]);
    }
}
