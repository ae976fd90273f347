//! Bounded LRU cache of document queue snapshots.

use lru::LruCache;
use mdtx_core::{DocKey, QueueDoc};
use std::num::NonZeroUsize;

/// LRU of the last-read queue snapshot per document.
///
/// A stale snapshot may over-report tokens (pulling an absent token is a
/// no-op) but never under-reports a token the engine still intends to
/// remove, because only aged completed transactions are processed. The
/// database stays authoritative: eviction discards, there is no write-back.
/// Hit and miss accounting belongs to the resolver; the cache is
/// policy-free.
pub struct DocCache {
    entries: LruCache<DocKey, QueueDoc>,
}

impl DocCache {
    /// Create a cache holding at most `capacity` snapshots (clamped to at
    /// least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        DocCache {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a snapshot, promoting it to most-recently-used.
    pub fn get(&mut self, key: &DocKey) -> Option<&QueueDoc> {
        self.entries.get(key)
    }

    /// Insert or replace a snapshot.
    pub fn put(&mut self, key: DocKey, doc: QueueDoc) {
        self.entries.put(key, doc);
    }

    /// Number of cached snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdtx_core::DocId;

    fn snapshot(id: i64) -> (DocKey, QueueDoc) {
        let key = DocKey::new("accounts", id);
        let doc = QueueDoc {
            id: DocId::from(id),
            queue: vec![],
            found_in_stash: false,
        };
        (key, doc)
    }

    #[test]
    fn test_miss_then_hit() {
        let mut cache = DocCache::new(4);
        let (key, doc) = snapshot(0);
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), doc.clone());
        assert_eq!(cache.get(&key), Some(&doc));
    }

    #[test]
    fn test_eviction_at_capacity() {
        let mut cache = DocCache::new(2);
        for id in 0..3 {
            let (key, doc) = snapshot(id);
            cache.put(key, doc);
        }
        assert_eq!(cache.len(), 2);
        // Oldest entry was discarded.
        assert!(cache.get(&DocKey::new("accounts", 0)).is_none());
        assert!(cache.get(&DocKey::new("accounts", 2)).is_some());
    }

    #[test]
    fn test_get_promotes() {
        let mut cache = DocCache::new(2);
        let (key0, doc0) = snapshot(0);
        let (key1, doc1) = snapshot(1);
        cache.put(key0.clone(), doc0);
        cache.put(key1, doc1);
        // Touch 0 so 1 becomes the eviction candidate.
        assert!(cache.get(&key0).is_some());
        let (key2, doc2) = snapshot(2);
        cache.put(key2, doc2);
        assert!(cache.get(&key0).is_some());
        assert!(cache.get(&DocKey::new("accounts", 1)).is_none());
    }

    #[test]
    fn test_put_replaces() {
        let mut cache = DocCache::new(2);
        let (key, mut doc) = snapshot(0);
        cache.put(key.clone(), doc.clone());
        doc.queue = vec!["token".to_string()];
        cache.put(key.clone(), doc.clone());
        assert_eq!(cache.get(&key).unwrap().queue, doc.queue);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let cache = DocCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }
}
