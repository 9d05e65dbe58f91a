//! In-flight Load Registry
//!
//! Per-key markers that let concurrent misses share one loader call.
//! Lives inside the cache's locked state; the marker for a key exists from
//! the moment its load starts until its result is published.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::watch;

use crate::error::{CacheError, Result};

type Slot<V> = Option<Result<V>>;

// == In-flight Loads ==
#[derive(Debug)]
pub struct InFlightLoads<K, V> {
    loads: HashMap<K, watch::Sender<Slot<V>>>,
}

impl<K, V> InFlightLoads<K, V>
where
    K: Hash + Eq + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            loads: HashMap::new(),
        }
    }

    // == Join ==
    /// Subscribes to the load already running for `key`, if any.
    pub fn join(&self, key: &K) -> Option<LoadWaiter<V>> {
        self.loads.get(key).map(|sender| LoadWaiter {
            key: format!("{key:?}"),
            receiver: sender.subscribe(),
        })
    }

    // == Register ==
    /// Marks a load for `key` as started and returns a waiter for its result.
    ///
    /// The caller must later [`take`](Self::take) the marker, either to
    /// publish a result or to abandon the load.
    pub fn register(&mut self, key: K) -> LoadWaiter<V> {
        let waiter_key = format!("{key:?}");
        let (sender, receiver) = watch::channel(None);
        self.loads.insert(key, sender);
        LoadWaiter {
            key: waiter_key,
            receiver,
        }
    }

    // == Take ==
    /// Removes the marker for `key`. Dropping the returned handle without
    /// completing it wakes waiters with [`CacheError::LoadAbandoned`].
    pub fn take(&mut self, key: &K) -> Option<LoadCompletion<V>> {
        self.loads.remove(key).map(LoadCompletion)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.loads.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }
}

impl<K, V> Default for InFlightLoads<K, V>
where
    K: Hash + Eq + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

// == Load Completion ==
/// Publishing side of one in-flight load.
#[derive(Debug)]
pub struct LoadCompletion<V>(watch::Sender<Slot<V>>);

impl<V> LoadCompletion<V> {
    /// Hands `result` to every waiter, including ones that have not polled yet.
    pub fn complete(self, result: Result<V>) {
        self.0.send_replace(Some(result));
    }
}

// == Load Waiter ==
/// Receiving side of one in-flight load.
#[derive(Debug)]
pub struct LoadWaiter<V> {
    key: String,
    receiver: watch::Receiver<Slot<V>>,
}

impl<V: Clone> LoadWaiter<V> {
    /// Waits for the load to publish its result.
    pub async fn wait(mut self) -> Result<V> {
        let abandoned = || CacheError::LoadAbandoned(self.key.clone());
        match self.receiver.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone().unwrap_or_else(|| Err(abandoned())),
            Err(_) => Err(abandoned()),
        }
    }
}
