//! Loading Cache Module
//!
//! The public cache facade: load-on-miss with per-key coalescing, bounded
//! size with policy-driven eviction, and removal notifications.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::cache::inflight::{InFlightLoads, LoadWaiter};
use crate::cache::notifier::{Notifier, Ticket};
use crate::cache::policy::policy_for;
use crate::cache::stats::StatsCounter;
use crate::cache::{
    CacheBuilder, CacheEntry, CacheLoader, CacheStats, EntryStore, EvictionOrder, EvictionPolicy,
    RemovalCause, RemovalNotification,
};
use crate::error::{BoxError, CacheError, Result};

type Removals<K, V> = Vec<RemovalNotification<K, V>>;

// == Load Mode ==
/// What a finished load does to an entry that is already cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    /// Fill a miss; a value put while loading wins over the loaded one
    Fill,
    /// Replace the cached value; on failure drop it with cause `Error`
    Refresh,
}

enum Begin<V> {
    Hit(V),
    Wait(LoadWaiter<V>),
}

// == Locked State ==
/// Everything guarded by the cache lock.
struct State<K, V> {
    store: EntryStore<K, V>,
    policy: Box<dyn EvictionPolicy<K>>,
    loading: InFlightLoads<K, V>,
}

impl<K, V> State<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    /// Reads a value, letting the policy record the access.
    fn touch(&mut self, key: &K) -> Option<V> {
        let entry = self.store.get_mut(key)?;
        if let Some(sequence) = self.policy.record_access(entry.sequence) {
            entry.sequence = sequence;
        }
        Some(entry.value.clone())
    }

    /// Removes an entry from both the store and the policy.
    fn remove(&mut self, key: &K) -> Option<CacheEntry<K, V>> {
        let entry = self.store.remove(key)?;
        self.policy.remove(entry.sequence);
        Some(entry)
    }
}

// == Shared Inner ==
struct Inner<K, V> {
    capacity: usize,
    eviction_order: EvictionOrder,
    state: RwLock<State<K, V>>,
    loader: Box<dyn CacheLoader<K, V>>,
    notifier: Notifier<K, V>,
    stats: StatsCounter,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Lookup ==
    /// Hit path. Insertion order needs only the read lock.
    fn lookup(&self, key: &K) -> Option<V> {
        match self.eviction_order {
            EvictionOrder::Insertion => {
                let state = self.state.read();
                state.store.get(key).map(|entry| entry.value.clone())
            }
            EvictionOrder::Access => self.state.write().touch(key),
        }
    }

    // == Mutate ==
    /// Runs `f` under the write lock, then delivers the removals it recorded.
    fn mutate<R>(&self, f: impl FnOnce(&mut State<K, V>, &mut Removals<K, V>) -> R) -> R {
        let (result, ticket) = self.mutate_locked(f);
        self.notifier.flush(ticket);
        result
    }

    /// Runs `f` under the write lock and queues its removals without
    /// delivering them. The caller must flush the returned ticket.
    fn mutate_locked<R>(
        &self,
        f: impl FnOnce(&mut State<K, V>, &mut Removals<K, V>) -> R,
    ) -> (R, Ticket) {
        let mut removals = Vec::new();
        let mut state = self.state.write();
        let result = f(&mut *state, &mut removals);
        // Queued before unlocking so delivery order matches mutation order
        (result, self.notifier.enqueue(removals))
    }

    // == Insert ==
    /// Inserts under the lock, replacing or evicting as needed.
    fn insert_locked(&self, state: &mut State<K, V>, key: K, value: V, removals: &mut Removals<K, V>) {
        if let Some(previous) = state.remove(&key) {
            debug!("Replacing cached value for key {:?}", key);
            removals.push(RemovalNotification::new(
                previous.key,
                previous.value,
                RemovalCause::Replaced,
            ));
        } else {
            while state.store.len() >= self.capacity {
                let Some(victim) = state.policy.select_victim().cloned() else {
                    break;
                };
                let Some(evicted) = state.remove(&victim) else {
                    break;
                };
                debug!("Evicting key {:?} to stay within capacity {}", victim, self.capacity);
                self.stats.record_eviction();
                removals.push(RemovalNotification::new(
                    evicted.key,
                    evicted.value,
                    RemovalCause::Size,
                ));
            }
        }

        let sequence = state.policy.record_insert(key.clone());
        state.store.put(CacheEntry::new(key, value, sequence));
    }

    // == Begin Load ==
    /// Joins the in-flight load for `key` or starts a new one.
    fn begin_load(self: &Arc<Self>, key: K, mode: LoadMode) -> Begin<V> {
        let mut state = self.state.write();

        if mode == LoadMode::Fill {
            if let Some(value) = state.touch(&key) {
                return Begin::Hit(value);
            }
        }

        if let Some(waiter) = state.loading.join(&key) {
            debug!("Joining in-flight load for key {:?}", key);
            return Begin::Wait(waiter);
        }

        let waiter = state.loading.register(key.clone());
        drop(state);

        debug!("Loading key {:?}", key);
        self.spawn_load(key, mode);
        Begin::Wait(waiter)
    }

    /// Runs the loader on the blocking pool, or inline outside a runtime.
    fn spawn_load(self: &Arc<Self>, key: K, mode: LoadMode) {
        let inner = Arc::clone(self);
        let task = move || inner.run_load(key, mode);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(task);
            }
            Err(_) => task(),
        }
    }

    // == Run Load ==
    fn run_load(&self, key: K, mode: LoadMode) {
        let guard = AbandonGuard {
            inner: self,
            key: &key,
            armed: true,
        };
        let loaded = self.loader.load(&key);
        guard.disarm();

        self.stats.record_load(loaded.is_ok());
        let result = loaded.map_err(|source: BoxError| {
            warn!("Loader failed for key {:?}: {}", key, source);
            CacheError::load(&key, source)
        });
        self.complete_load(key, mode, result);
    }

    // == Complete Load ==
    /// Applies a finished load to the cache and publishes it to waiters.
    ///
    /// Waiters are woken before the removals are delivered: a listener
    /// blocked on this very load must be able to return so the drain it
    /// belongs to can reach our notifications.
    fn complete_load(&self, key: K, mode: LoadMode, result: Result<V>) {
        let ((completion, outcome), ticket) = self.mutate_locked(|state, removals| {
            let completion = state.loading.take(&key);
            let outcome = match (result, mode) {
                (Ok(value), LoadMode::Fill) => match state.store.get(&key) {
                    Some(current) => Ok(current.value.clone()),
                    None => {
                        self.insert_locked(state, key.clone(), value.clone(), removals);
                        Ok(value)
                    }
                },
                (Ok(value), LoadMode::Refresh) => {
                    self.insert_locked(state, key.clone(), value.clone(), removals);
                    Ok(value)
                }
                (Err(error), LoadMode::Fill) => Err(error),
                (Err(error), LoadMode::Refresh) => {
                    if let Some(stale) = state.remove(&key) {
                        removals.push(RemovalNotification::new(
                            stale.key,
                            stale.value,
                            RemovalCause::Error,
                        ));
                    }
                    Err(error)
                }
            };
            (completion, outcome)
        });

        if let Some(completion) = completion {
            completion.complete(outcome);
        }
        self.notifier.flush(ticket);
    }
}

/// Releases the in-flight marker if the loader unwinds.
///
/// Dropping the marker's sender wakes waiters with `LoadAbandoned`, and the
/// next caller starts a fresh load.
struct AbandonGuard<'a, K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: &'a Inner<K, V>,
    key: &'a K,
    armed: bool,
}

impl<K, V> AbandonGuard<'_, K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<K, V> Drop for AbandonGuard<'_, K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.armed {
            warn!("Load for key {:?} abandoned", self.key);
            let abandoned = self.inner.state.write().loading.take(self.key);
            drop(abandoned);
        }
    }
}

// == Loading Cache ==
/// A bounded, concurrent cache that loads missing values on demand.
///
/// Clones share the same underlying cache.
///
/// # Example
/// ```
/// use loadcache::cache::{LoadingCache, FnLoader};
///
/// # tokio_test::block_on(async {
/// let cache = LoadingCache::new(3, FnLoader(|key: &String| {
///     Ok::<_, loadcache::BoxError>(key.to_uppercase())
/// }))
/// .unwrap();
///
/// assert_eq!(cache.get_or_load("first".to_string()).await.unwrap(), "FIRST");
/// assert_eq!(cache.size(), 1);
/// # });
/// ```
pub struct LoadingCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for LoadingCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> LoadingCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an insertion-order cache with no listener.
    ///
    /// Fails with [`CacheError::InvalidCapacity`] if `capacity` is zero.
    pub fn new<L: CacheLoader<K, V>>(capacity: usize, loader: L) -> Result<Self> {
        CacheBuilder::new(capacity).build(loader)
    }

    /// Starts a [`CacheBuilder`].
    pub fn builder(capacity: usize) -> CacheBuilder<K, V> {
        CacheBuilder::new(capacity)
    }

    pub(crate) fn from_parts(
        capacity: usize,
        eviction_order: EvictionOrder,
        loader: Box<dyn CacheLoader<K, V>>,
        notifier: Notifier<K, V>,
    ) -> Self {
        let state = State {
            store: EntryStore::with_capacity(capacity),
            policy: policy_for(eviction_order),
            loading: InFlightLoads::new(),
        };
        Self {
            inner: Arc::new(Inner {
                capacity,
                eviction_order,
                state: RwLock::new(state),
                loader,
                notifier,
                stats: StatsCounter::new(),
            }),
        }
    }

    // == Get Or Load ==
    /// Returns the cached value for `key`, loading it on a miss.
    ///
    /// Concurrent misses on the same key share one loader call and all
    /// receive its outcome. A failed load caches nothing. Dropping the
    /// returned future does not cancel the load for other callers.
    pub async fn get_or_load(&self, key: K) -> Result<V> {
        self.get_or_load_with_cancel(key, std::future::pending::<()>())
            .await
    }

    /// Like [`get_or_load`](Self::get_or_load), but gives up with
    /// [`CacheError::Cancelled`] if `cancel` completes first.
    ///
    /// The in-flight load keeps running and still populates the cache for
    /// everyone else.
    pub async fn get_or_load_with_cancel<F>(&self, key: K, cancel: F) -> Result<V>
    where
        F: Future,
    {
        if let Some(value) = self.inner.lookup(&key) {
            self.inner.stats.record_hit();
            debug!("Cache hit for key {:?}", key);
            return Ok(value);
        }

        let waiter = match self.inner.begin_load(key.clone(), LoadMode::Fill) {
            Begin::Hit(value) => {
                self.inner.stats.record_hit();
                return Ok(value);
            }
            Begin::Wait(waiter) => waiter,
        };
        self.inner.stats.record_miss();

        tokio::select! {
            biased;
            result = waiter.wait() => result,
            _ = cancel => {
                debug!("Gave up waiting on load for key {:?}", key);
                Err(CacheError::Cancelled(format!("{key:?}")))
            }
        }
    }

    // == Get If Present ==
    /// Returns the cached value without loading.
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        let value = self.inner.lookup(key);
        if value.is_some() {
            self.inner.stats.record_hit();
        } else {
            self.inner.stats.record_miss();
        }
        value
    }

    // == Refresh ==
    /// Reloads `key`, replacing the cached value on success.
    ///
    /// If the reload fails, a cached value for `key` is removed with cause
    /// [`RemovalCause::Error`] and the error is returned.
    ///
    /// A refresh joins a load already in flight for the key instead of
    /// starting another, and takes that load's outcome as its own. When the
    /// in-flight load is a miss fill started by
    /// [`get_or_load`](Self::get_or_load), a failure leaves any value put in
    /// the meantime cached and sends no `Error` notification; call `refresh`
    /// again once the fill has finished to force a reload.
    pub async fn refresh(&self, key: K) -> Result<V> {
        match self.inner.begin_load(key, LoadMode::Refresh) {
            Begin::Hit(value) => Ok(value),
            Begin::Wait(waiter) => waiter.wait().await,
        }
    }

    // == Put ==
    /// Stores `value` under `key`.
    ///
    /// Overwriting fires one `Replaced` notification and never evicts;
    /// inserting a new key into a full cache evicts one entry first.
    pub fn put(&self, key: K, value: V) {
        self.inner.mutate(|state, removals| {
            self.inner.insert_locked(state, key, value, removals);
        });
    }

    // == Invalidate ==
    /// Removes `key` with cause `Explicit`. Absent keys are a no-op.
    pub fn invalidate(&self, key: &K) {
        self.inner.mutate(|state, removals| {
            if let Some(entry) = state.remove(key) {
                debug!("Invalidated key {:?}", key);
                removals.push(RemovalNotification::new(
                    entry.key,
                    entry.value,
                    RemovalCause::Explicit,
                ));
            }
        });
    }

    /// Removes every entry, oldest first, each with cause `Explicit`.
    ///
    /// Loads already in flight are not cancelled and still insert their result.
    pub fn invalidate_all(&self) {
        self.inner.mutate(|state, removals| {
            state.policy.clear();
            removals.extend(state.store.drain_ordered().into_iter().map(|entry| {
                RemovalNotification::new(entry.key, entry.value, RemovalCause::Explicit)
            }));
        });
    }

    // == Size ==
    /// Current number of entries; never exceeds [`capacity`](Self::capacity).
    pub fn size(&self) -> usize {
        self.inner.state.read().store.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn eviction_order(&self) -> EvictionOrder {
        self.inner.eviction_order
    }

    /// True if `key` is cached. Does not count as an access.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.state.read().store.contains_key(key)
    }

    // == As Map ==
    /// Consistent snapshot of every entry, ordered from next-to-evict to newest.
    pub fn as_map(&self) -> Vec<(K, V)> {
        self.inner.state.read().store.snapshot()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.size())
    }

    /// Checks the store/policy bijection and the capacity bound.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let state = self.inner.state.read();
        assert!(state.store.len() <= self.inner.capacity, "size exceeds capacity");
        assert_eq!(state.store.len(), state.policy.len(), "store and policy disagree");
        for (key, sequence) in state.store.sequences() {
            assert_eq!(state.policy.key_at(sequence), Some(key), "policy slot mismatch");
        }
    }
}

impl<K: 'static, V: 'static> Debug for LoadingCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingCache")
            .field("capacity", &self.inner.capacity)
            .field("eviction_order", &self.inner.eviction_order)
            .field("has_listener", &self.inner.notifier.has_listener())
            .finish_non_exhaustive()
    }
}
