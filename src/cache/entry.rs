//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with their ordering marker.

// == Cache Entry ==
/// Represents a single cache entry with value and eviction-order metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<K, V> {
    /// The key this entry is stored under
    pub key: K,
    /// The stored value
    pub value: V,
    /// Position in the eviction order; lower is older
    pub sequence: u64,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new cache entry at the given sequence position.
    pub fn new(key: K, value: V, sequence: u64) -> Self {
        Self {
            key,
            value,
            sequence,
        }
    }

    // == Into Parts ==
    /// Consumes the entry, returning its key and value.
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("key", "value".to_string(), 7);

        assert_eq!(entry.key, "key");
        assert_eq!(entry.value, "value");
        assert_eq!(entry.sequence, 7);
    }

    #[test]
    fn test_entry_into_parts() {
        let entry = CacheEntry::new(1u32, 10u64, 0);
        assert_eq!(entry.into_parts(), (1, 10));
    }
}
