//! Entry Store Module
//!
//! Authoritative key-value storage. Capacity is enforced by the caller
//! through the eviction policy, never by the store itself.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::CacheEntry;

// == Entry Store ==
/// HashMap-backed storage of cache entries keyed by `K`.
#[derive(Debug)]
pub struct EntryStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<K, V>>,
}

impl<K, V> EntryStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty store sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    // == Get ==
    /// Looks up the entry stored under `key`.
    pub fn get(&self, key: &K) -> Option<&CacheEntry<K, V>> {
        self.entries.get(key)
    }

    /// Mutable lookup, used to update an entry's sequence on access.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut CacheEntry<K, V>> {
        self.entries.get_mut(key)
    }

    // == Put ==
    /// Inserts or overwrites an entry, returning the previous one.
    pub fn put(&mut self, entry: CacheEntry<K, V>) -> Option<CacheEntry<K, V>> {
        self.entries.insert(entry.key.clone(), entry)
    }

    // == Remove ==
    /// Removes and returns the entry for `key`. Absent keys return `None`.
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<K, V>> {
        self.entries.remove(key)
    }

    // == Contains ==
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Snapshot ==
    /// Returns every key-value pair ordered by sequence, oldest first.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        let mut ordered: Vec<&CacheEntry<K, V>> = self.entries.values().collect();
        ordered.sort_unstable_by_key(|entry| entry.sequence);
        ordered
            .into_iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    // == Drain Ordered ==
    /// Removes every entry, returning them oldest first.
    pub fn drain_ordered(&mut self) -> Vec<CacheEntry<K, V>> {
        let mut drained: Vec<CacheEntry<K, V>> = self.entries.drain().map(|(_, e)| e).collect();
        drained.sort_unstable_by_key(|entry| entry.sequence);
        drained
    }

    /// Iterates over `(key, sequence)` pairs in no particular order.
    pub fn sequences(&self) -> impl Iterator<Item = (&K, u64)> + '_ {
        self.entries.iter().map(|(key, entry)| (key, entry.sequence))
    }
}
