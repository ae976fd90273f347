//! Three-tier document resolution: cache, primary collections, stash.

use crate::cache::DocCache;
use crate::stats::PrunerStats;
use mdtx_core::{DocId, DocKey, QueueDoc, StashDoc, StashKey};
use mdtx_store::{BoxCursor, DocStore, StoreError};
use std::collections::{HashMap, HashSet};

/// Resolves current queue views for the batch pruner.
///
/// Borrows the engine's cache and statistics for the duration of one batch.
pub struct DocResolver<'a, S: DocStore> {
    store: &'a S,
    cache: &'a mut DocCache,
    stats: &'a mut PrunerStats,
    doc_batch_size: usize,
}

impl<'a, S: DocStore> DocResolver<'a, S> {
    pub fn new(
        store: &'a S,
        cache: &'a mut DocCache,
        stats: &'a mut PrunerStats,
        doc_batch_size: usize,
    ) -> Self {
        DocResolver {
            store,
            cache,
            stats,
            doc_batch_size,
        }
    }

    /// Resolve queue views for every key in `keys`.
    ///
    /// Each input key is either present in the result with an
    /// up-to-date-enough view, or absent, meaning it was found in neither
    /// its primary collection nor the stash at resolution time. Absence is
    /// not an error; driver and cursor-close failures are.
    pub fn lookup_docs(
        &mut self,
        stash_collection: &str,
        keys: &HashSet<DocKey>,
    ) -> Result<HashMap<DocKey, QueueDoc>, StoreError> {
        let mut docs = HashMap::with_capacity(keys.len());
        let mut by_collection: HashMap<String, Vec<DocId>> = HashMap::new();
        for key in keys {
            if let Some(cached) = self.cache.get(key) {
                // A stale snapshot is acceptable: live writers only add
                // tokens for transactions newer than the ones being pruned,
                // and re-pulling an already-pulled token is a no-op. What a
                // snapshot can never do is hide a token of a transaction
                // this old.
                docs.insert(key.clone(), cached.clone());
                self.stats.doc_cache_hits += 1;
            } else {
                self.stats.doc_cache_misses += 1;
                by_collection
                    .entry(key.collection.clone())
                    .or_default()
                    .push(key.doc_id.clone());
            }
        }

        let mut missing_keys: Vec<StashKey> = Vec::new();
        for (collection, ids) in &by_collection {
            let mut missing: HashSet<DocId> = ids.iter().cloned().collect();
            self.stats.collection_queries += 1;
            let cursor = self.store.queue_docs(collection, ids, self.doc_batch_size)?;
            self.drain_primary(collection, cursor, &mut missing, &mut docs)?;
            self.stats.doc_still_missing += missing.len() as u64;
            for id in missing {
                missing_keys.push(StashKey {
                    collection: collection.clone(),
                    id,
                });
            }
        }

        // A document can be mid-flight between its collection and the stash
        // while the live system inserts or removes it. Whichever operation
        // moves it also cleans its queue traffic, so a key found in neither
        // place is "cannot prove clean", not corruption; the caller keeps
        // the transaction.
        if !missing_keys.is_empty() {
            self.stats.stash_queries += 1;
            let cursor = self
                .store
                .stash_docs(stash_collection, &missing_keys, self.doc_batch_size)?;
            self.drain_stash(cursor, &mut docs)?;
        }

        Ok(docs)
    }

    fn drain_primary(
        &mut self,
        collection: &str,
        mut cursor: BoxCursor<QueueDoc>,
        missing: &mut HashSet<DocId>,
        docs: &mut HashMap<DocKey, QueueDoc>,
    ) -> Result<(), StoreError> {
        loop {
            match cursor.next() {
                Ok(Some(doc)) => {
                    let key = DocKey {
                        collection: collection.to_string(),
                        doc_id: doc.id.clone(),
                    };
                    missing.remove(&doc.id);
                    self.cache.put(key.clone(), doc.clone());
                    docs.insert(key, doc);
                    self.stats.doc_reads += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    let _ = cursor.close();
                    return Err(err);
                }
            }
        }
        // Close errors are reported as query errors.
        cursor.close()
    }

    fn drain_stash(
        &mut self,
        mut cursor: BoxCursor<StashDoc>,
        docs: &mut HashMap<DocKey, QueueDoc>,
    ) -> Result<(), StoreError> {
        loop {
            match cursor.next() {
                Ok(Some(entry)) => {
                    let key = DocKey::from(entry.id.clone());
                    let doc = QueueDoc {
                        id: entry.id.id,
                        queue: entry.queue,
                        found_in_stash: true,
                    };
                    self.cache.put(key.clone(), doc.clone());
                    docs.insert(key, doc);
                    self.stats.stash_reads += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    let _ = cursor.close();
                    return Err(err);
                }
            }
        }
        cursor.close()
    }
}
