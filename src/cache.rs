//! Request-scoped cache of resolved load outcomes
//!
//! One instance lives inside each loader and shares its lifetime: it fills
//! up over the course of a request and is dropped with it. There is no TTL
//! and no invalidation; a key that has been resolved once stays resolved.

use std::collections::HashMap;
use std::hash::Hash;

/// Append-only map from key to resolved outcome.
///
/// `None` records that the key was fetched and had no matching record.
/// Absence is a cached outcome like any other, so a missing entity is
/// looked up at most once per request.
#[derive(Debug)]
pub(crate) struct RequestCache<K, V> {
    entries: HashMap<K, Option<V>>,
}

impl<K: Eq + Hash, V> RequestCache<K, V> {
    pub(crate) fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&Option<V>> {
        self.entries.get(key)
    }

    /// Record an outcome for a key. The first write wins; a key is never
    /// overwritten once resolved.
    pub(crate) fn insert(&mut self, key: K, outcome: Option<V>) {
        self.entries.entry(key).or_insert(outcome);
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_and_get() {
        let mut cache: RequestCache<u32, &str> = RequestCache::new();
        assert!(cache.is_empty());

        cache.insert(1, Some("author 1"));
        cache.insert(2, None);

        assert_eq!(cache.get(&1), Some(&Some("author 1")));
        assert_eq!(cache.get(&2), Some(&None));
        assert_eq!(cache.get(&3), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_absent_outcome_is_cached() {
        let mut cache: RequestCache<u32, &str> = RequestCache::new();
        cache.insert(7, None);

        assert!(cache.contains(&7));
        assert_eq!(cache.get(&7), Some(&None));
    }

    #[test]
    fn test_first_write_wins() {
        let mut cache: RequestCache<u32, &str> = RequestCache::new();
        cache.insert(1, Some("first"));
        cache.insert(1, Some("second"));

        assert_eq!(cache.get(&1), Some(&Some("first")));
        assert_eq!(cache.len(), 1);
    }
}
