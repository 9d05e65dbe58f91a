//! Loader Module
//!
//! The computation a cache runs to produce the value for a missing key.

use crate::error::BoxError;

// == Cache Loader ==
/// Produces the value for a key that is not cached.
///
/// The cache guarantees at most one in-flight call per key; concurrent
/// misses on the same key wait for that call instead of starting their own.
/// Loads run on Tokio's blocking pool when a runtime is available, so a
/// loader may block.
pub trait CacheLoader<K, V>: Send + Sync + 'static {
    fn load(&self, key: &K) -> Result<V, BoxError>;
}

/// A [`CacheLoader`] backed by a closure.
///
/// Created via [`CacheBuilder::build_with`](crate::cache::CacheBuilder::build_with).
pub struct FnLoader<F>(pub F);

impl<K, V, F> CacheLoader<K, V> for FnLoader<F>
where
    F: Fn(&K) -> Result<V, BoxError> + Send + Sync + 'static,
{
    fn load(&self, key: &K) -> Result<V, BoxError> {
        (self.0)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_loader_success() {
        let loader = FnLoader(|key: &String| Ok(key.to_uppercase()));
        assert_eq!(loader.load(&"first".to_string()).unwrap(), "FIRST");
    }

    #[test]
    fn test_fn_loader_failure() {
        let loader = FnLoader(|_: &u32| -> Result<u32, BoxError> { Err("no such row".into()) });

        let err = loader.load(&1).unwrap_err();
        assert_eq!(err.to_string(), "no such row");
    }
}
