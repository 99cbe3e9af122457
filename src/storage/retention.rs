//! Bounded retention: keep the newest `capacity` keys by creation token.
//!
//! Keys order by their creation token (lexicographic for snapshot names), so
//! "oldest" is simply the smallest key.

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct RetentionSet<K: Ord + Clone> {
    capacity: usize,
    entries: BTreeSet<K>,
}

impl<K: Ord + Clone> RetentionSet<K> {
    /// Build from keys already on hand without evicting anything yet.
    pub fn with_keys(capacity: usize, keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            capacity,
            entries: keys.into_iter().collect(),
        }
    }

    /// Drop the oldest keys until at most `capacity` remain, returning them
    /// oldest first.
    pub fn evict_excess(&mut self) -> Vec<K> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            match self.entries.pop_first() {
                Some(oldest) => evicted.push(oldest),
                None => break,
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_first() {
        let mut set = RetentionSet::with_keys(2, vec![5, 1, 4, 2, 3]);
        assert_eq!(set.len(), 5);
        assert_eq!(set.evict_excess(), vec![1, 2, 3]);
        assert_eq!(set.len(), 2);
        assert!(set.evict_excess().is_empty());
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let mut set = RetentionSet::with_keys(3, vec!["b", "a", "b", "c"]);
        assert_eq!(set.len(), 3);
        assert!(set.evict_excess().is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut set = RetentionSet::with_keys(0, vec![1]);
        assert_eq!(set.evict_excess(), vec![1]);
        assert!(set.is_empty());
    }
}
