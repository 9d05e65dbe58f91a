//! Eviction Policy Module
//!
//! Tracks the ordering signal used to choose an eviction victim.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// == Eviction Order ==
/// Which ordering signal decides the eviction victim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionOrder {
    /// Evict the least recently inserted key (reads do not reorder)
    #[default]
    Insertion,
    /// Evict the least recently used key (hits move a key to the newest end)
    Access,
}

impl FromStr for EvictionOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insertion" | "fifo" => Ok(EvictionOrder::Insertion),
            "access" | "lru" => Ok(EvictionOrder::Access),
            other => Err(format!("unknown eviction order: {other}")),
        }
    }
}

impl fmt::Display for EvictionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionOrder::Insertion => f.write_str("insertion"),
            EvictionOrder::Access => f.write_str("access"),
        }
    }
}

// == Eviction Policy ==
/// Victim-selection strategy consulted by the cache.
///
/// Keys are addressed by the sequence number handed out by
/// [`record_insert`](EvictionPolicy::record_insert); the cache stores that
/// sequence on the entry so both sides stay in lockstep.
pub trait EvictionPolicy<K>: Send + Sync {
    /// Places `key` at the most recent end and returns its new sequence.
    fn record_insert(&mut self, key: K) -> u64;

    /// Notes a read hit on the key at `sequence`.
    ///
    /// Returns the key's new sequence if the policy reordered it.
    fn record_access(&mut self, sequence: u64) -> Option<u64>;

    /// Forgets the key at `sequence`, returning it if it was tracked.
    fn remove(&mut self, sequence: u64) -> Option<K>;

    /// Returns the key that should be evicted next, if any.
    fn select_victim(&self) -> Option<&K>;

    /// Returns the key tracked at `sequence`.
    fn key_at(&self, sequence: u64) -> Option<&K>;

    /// Forgets every tracked key.
    fn clear(&mut self);

    /// Returns the number of tracked keys.
    fn len(&self) -> usize;

    /// Returns true if no keys are tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ordering this policy implements.
    fn order(&self) -> EvictionOrder;
}

/// Builds the policy for the requested ordering.
pub fn policy_for<K>(order: EvictionOrder) -> Box<dyn EvictionPolicy<K>>
where
    K: Send + Sync + 'static,
{
    match order {
        EvictionOrder::Insertion => Box::new(FifoPolicy::new()),
        EvictionOrder::Access => Box::new(LruPolicy::new()),
    }
}

// == Sequence Index ==
/// Keys ordered by a strictly increasing sequence number.
///
/// Oldest key = smallest sequence.
#[derive(Debug)]
struct SequenceIndex<K> {
    order: BTreeMap<u64, K>,
    next: u64,
}

impl<K> SequenceIndex<K> {
    fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            next: 0,
        }
    }

    fn push(&mut self, key: K) -> u64 {
        let sequence = self.next;
        self.next += 1;
        self.order.insert(sequence, key);
        sequence
    }

    fn remove(&mut self, sequence: u64) -> Option<K> {
        self.order.remove(&sequence)
    }

    fn oldest(&self) -> Option<&K> {
        self.order.values().next()
    }

    fn get(&self, sequence: u64) -> Option<&K> {
        self.order.get(&sequence)
    }

    fn clear(&mut self) {
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

// == FIFO Policy ==
/// Evicts in insertion order; read hits leave the order untouched.
#[derive(Debug)]
pub struct FifoPolicy<K> {
    index: SequenceIndex<K>,
}

impl<K> FifoPolicy<K> {
    // == Constructor ==
    /// Creates an empty insertion-order policy.
    pub fn new() -> Self {
        Self {
            index: SequenceIndex::new(),
        }
    }
}

impl<K> Default for FifoPolicy<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Send + Sync> EvictionPolicy<K> for FifoPolicy<K> {
    fn record_insert(&mut self, key: K) -> u64 {
        self.index.push(key)
    }

    fn record_access(&mut self, _sequence: u64) -> Option<u64> {
        None
    }

    fn remove(&mut self, sequence: u64) -> Option<K> {
        self.index.remove(sequence)
    }

    fn select_victim(&self) -> Option<&K> {
        self.index.oldest()
    }

    fn key_at(&self, sequence: u64) -> Option<&K> {
        self.index.get(sequence)
    }

    fn clear(&mut self) {
        self.index.clear();
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn order(&self) -> EvictionOrder {
        EvictionOrder::Insertion
    }
}

// == LRU Policy ==
/// Evicts the least recently used key; read hits move a key to the newest end.
#[derive(Debug)]
pub struct LruPolicy<K> {
    index: SequenceIndex<K>,
}

impl<K> LruPolicy<K> {
    // == Constructor ==
    /// Creates an empty access-order policy.
    pub fn new() -> Self {
        Self {
            index: SequenceIndex::new(),
        }
    }
}

impl<K> Default for LruPolicy<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Send + Sync> EvictionPolicy<K> for LruPolicy<K> {
    fn record_insert(&mut self, key: K) -> u64 {
        self.index.push(key)
    }

    fn record_access(&mut self, sequence: u64) -> Option<u64> {
        let key = self.index.remove(sequence)?;
        Some(self.index.push(key))
    }

    fn remove(&mut self, sequence: u64) -> Option<K> {
        self.index.remove(sequence)
    }

    fn select_victim(&self) -> Option<&K> {
        self.index.oldest()
    }

    fn key_at(&self, sequence: u64) -> Option<&K> {
        self.index.get(sequence)
    }

    fn clear(&mut self) {
        self.index.clear();
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn order(&self) -> EvictionOrder {
        EvictionOrder::Access
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_new() {
        let policy: FifoPolicy<&str> = FifoPolicy::new();
        assert!(policy.is_empty());
        assert_eq!(policy.select_victim(), None);
    }

    #[test]
    fn test_fifo_victim_is_first_inserted() {
        let mut policy = FifoPolicy::new();

        policy.record_insert("first");
        policy.record_insert("second");
        policy.record_insert("third");

        assert_eq!(policy.len(), 3);
        assert_eq!(policy.select_victim(), Some(&"first"));
    }

    #[test]
    fn test_fifo_ignores_access() {
        let mut policy = FifoPolicy::new();

        let a = policy.record_insert("a");
        policy.record_insert("b");

        assert_eq!(policy.record_access(a), None);
        assert_eq!(policy.select_victim(), Some(&"a"));
    }

    #[test]
    fn test_sequences_strictly_increase() {
        let mut policy = FifoPolicy::new();

        let a = policy.record_insert("a");
        let b = policy.record_insert("b");
        policy.remove(a);
        let c = policy.record_insert("c");

        assert!(a < b && b < c);
    }

    #[test]
    fn test_remove_then_victim() {
        let mut policy = FifoPolicy::new();

        let a = policy.record_insert("a");
        policy.record_insert("b");

        assert_eq!(policy.key_at(a), Some(&"a"));
        assert_eq!(policy.remove(a), Some("a"));
        assert_eq!(policy.remove(a), None);
        assert_eq!(policy.key_at(a), None);
        assert_eq!(policy.select_victim(), Some(&"b"));
    }

    #[test]
    fn test_reinsert_moves_to_newest_end() {
        let mut policy = FifoPolicy::new();

        let a = policy.record_insert("a");
        policy.record_insert("b");

        // Replacement: forget the old slot, insert again
        policy.remove(a);
        policy.record_insert("a");

        assert_eq!(policy.select_victim(), Some(&"b"));
    }

    #[test]
    fn test_lru_access_reorders() {
        let mut policy = LruPolicy::new();

        let a = policy.record_insert("a");
        policy.record_insert("b");
        policy.record_insert("c");

        let moved = policy.record_access(a).unwrap();
        assert!(moved > a);
        assert_eq!(policy.select_victim(), Some(&"b"));
        assert_eq!(policy.len(), 3);
    }

    #[test]
    fn test_lru_access_unknown_sequence() {
        let mut policy: LruPolicy<&str> = LruPolicy::new();
        assert_eq!(policy.record_access(42), None);
        assert!(policy.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut policy = LruPolicy::new();
        policy.record_insert(1);
        policy.record_insert(2);

        policy.clear();

        assert!(policy.is_empty());
        assert_eq!(policy.select_victim(), None);
    }

    #[test]
    fn test_policy_for_order() {
        let fifo = policy_for::<u32>(EvictionOrder::Insertion);
        let lru = policy_for::<u32>(EvictionOrder::Access);

        assert_eq!(fifo.order(), EvictionOrder::Insertion);
        assert_eq!(lru.order(), EvictionOrder::Access);
    }

    #[test]
    fn test_eviction_order_parse() {
        assert_eq!("insertion".parse::<EvictionOrder>(), Ok(EvictionOrder::Insertion));
        assert_eq!("FIFO".parse::<EvictionOrder>(), Ok(EvictionOrder::Insertion));
        assert_eq!(" access ".parse::<EvictionOrder>(), Ok(EvictionOrder::Access));
        assert_eq!("lru".parse::<EvictionOrder>(), Ok(EvictionOrder::Access));
        assert!("random".parse::<EvictionOrder>().is_err());
        assert_eq!(EvictionOrder::Access.to_string(), "access");
    }
}
