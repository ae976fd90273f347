//! In-memory document store.
//!
//! Reference implementation of [`DocStore`] used by tests and the demo app.
//! Collections are `BTreeMap`s keyed by `_id`, so transaction scans come
//! back in ascending id order the way the engine expects from a real
//! driver. Handles are shared by reference; interior state sits behind an
//! `RwLock`.

use crate::cursor::{BoxCursor, VecCursor};
use crate::error::{Result, StoreError};
use crate::store::{DocStore, TxnSelector};
use mdtx_core::{DocId, ObjectId, QueueDoc, StashDoc, StashKey, TxnDoc, TxnRecord};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct Inner {
    /// Primary collections: name → (`_id` → `txn-queue`).
    collections: HashMap<String, BTreeMap<DocId, Vec<String>>>,
    /// Stash collections: name → (compound key → `txn-queue`).
    stashes: HashMap<String, BTreeMap<StashKey, Vec<String>>>,
    /// Transaction collections: name → (`_id` → full record).
    txns: HashMap<String, BTreeMap<ObjectId, TxnDoc>>,
}

/// An in-memory database.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Insert a transaction record.
    pub fn insert_txn(&self, collection: &str, doc: TxnDoc) {
        let mut inner = self.inner.write();
        inner
            .txns
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id, doc);
    }

    /// Insert (or replace) a primary document's queue.
    pub fn insert_queue_doc(&self, collection: &str, id: DocId, queue: Vec<String>) {
        let mut inner = self.inner.write();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, queue);
    }

    /// Insert (or replace) a stash entry.
    pub fn insert_stash_doc(&self, collection: &str, key: StashKey, queue: Vec<String>) {
        let mut inner = self.inner.write();
        inner
            .stashes
            .entry(collection.to_string())
            .or_default()
            .insert(key, queue);
    }

    /// Append a token to a primary document's queue, creating the document
    /// if absent. This is what the live transaction runtime does when it
    /// touches a document.
    pub fn push_queue_token(&self, collection: &str, id: &DocId, token: &str) {
        let mut inner = self.inner.write();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.clone())
            .or_default()
            .push(token.to_string());
    }

    /// Append a token to a stash entry's queue, creating the entry if
    /// absent.
    pub fn push_stash_token(&self, collection: &str, key: &StashKey, token: &str) {
        let mut inner = self.inner.write();
        inner
            .stashes
            .entry(collection.to_string())
            .or_default()
            .entry(key.clone())
            .or_default()
            .push(token.to_string());
    }

    /// Delete a primary document outright, as an insert/remove transaction
    /// relocating it would. Returns whether it existed.
    pub fn remove_queue_doc(&self, collection: &str, id: &DocId) -> bool {
        let mut inner = self.inner.write();
        inner
            .collections
            .get_mut(collection)
            .map(|coll| coll.remove(id).is_some())
            .unwrap_or(false)
    }

    /// Delete a stash entry. Returns whether it existed.
    pub fn remove_stash_doc(&self, collection: &str, key: &StashKey) -> bool {
        let mut inner = self.inner.write();
        inner
            .stashes
            .get_mut(collection)
            .map(|coll| coll.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Current queue of a primary document.
    pub fn queue(&self, collection: &str, id: &DocId) -> Option<Vec<String>> {
        let inner = self.inner.read();
        inner.collections.get(collection)?.get(id).cloned()
    }

    /// Current queue of a stash entry.
    pub fn stash_queue(&self, collection: &str, key: &StashKey) -> Option<Vec<String>> {
        let inner = self.inner.read();
        inner.stashes.get(collection)?.get(key).cloned()
    }

    /// Whether a transaction record still exists.
    pub fn contains_txn(&self, collection: &str, id: &ObjectId) -> bool {
        let inner = self.inner.read();
        inner
            .txns
            .get(collection)
            .map(|coll| coll.contains_key(id))
            .unwrap_or(false)
    }

    /// All transaction ids in ascending order.
    pub fn txn_ids(&self, collection: &str) -> Vec<ObjectId> {
        let inner = self.inner.read();
        inner
            .txns
            .get(collection)
            .map(|coll| coll.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of transaction records.
    pub fn txn_count(&self, collection: &str) -> usize {
        let inner = self.inner.read();
        inner.txns.get(collection).map(BTreeMap::len).unwrap_or(0)
    }
}

fn pull_from(queue: &mut Vec<String>, tokens: &[String]) {
    queue.retain(|token| !tokens.contains(token));
}

impl DocStore for MemoryStore {
    fn queue_docs(
        &self,
        collection: &str,
        ids: &[DocId],
        _batch: usize,
    ) -> Result<BoxCursor<QueueDoc>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        if let Some(coll) = inner.collections.get(collection) {
            for id in ids {
                if let Some(queue) = coll.get(id) {
                    out.push(QueueDoc {
                        id: id.clone(),
                        queue: queue.clone(),
                        found_in_stash: false,
                    });
                }
            }
        }
        Ok(Box::new(VecCursor::new(out)))
    }

    fn stash_docs(
        &self,
        collection: &str,
        keys: &[StashKey],
        _batch: usize,
    ) -> Result<BoxCursor<StashDoc>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        if let Some(coll) = inner.stashes.get(collection) {
            for key in keys {
                if let Some(queue) = coll.get(key) {
                    out.push(StashDoc {
                        id: key.clone(),
                        queue: queue.clone(),
                    });
                }
            }
        }
        Ok(Box::new(VecCursor::new(out)))
    }

    fn select_txns(
        &self,
        collection: &str,
        selector: &TxnSelector,
        _batch: usize,
    ) -> Result<BoxCursor<TxnRecord>> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        if let Some(coll) = inner.txns.get(collection) {
            // BTreeMap iteration gives ascending `_id` order.
            for (id, doc) in coll.iter() {
                if selector.matches(doc.state, id) {
                    out.push(doc.record());
                }
            }
        }
        Ok(Box::new(VecCursor::new(out)))
    }

    fn pull_queue_tokens(&self, collection: &str, id: &DocId, tokens: &[String]) -> Result<()> {
        let mut inner = self.inner.write();
        let queue = inner
            .collections
            .get_mut(collection)
            .and_then(|coll| coll.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        pull_from(queue, tokens);
        Ok(())
    }

    fn pull_stash_tokens(
        &self,
        collection: &str,
        key: &StashKey,
        tokens: &[String],
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let queue = inner
            .stashes
            .get_mut(collection)
            .and_then(|coll| coll.get_mut(key))
            .ok_or(StoreError::NotFound)?;
        pull_from(queue, tokens);
        Ok(())
    }

    fn remove_txns(&self, collection: &str, ids: &[ObjectId]) -> Result<u64> {
        let mut inner = self.inner.write();
        let Some(coll) = inner.txns.get_mut(collection) else {
            return Ok(0);
        };
        let mut removed = 0;
        for id in ids {
            if coll.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use mdtx_core::{format_token, DocKey, TxnState};
    use std::time::{Duration, SystemTime};

    const TXNS: &str = "txns";

    fn txn_at(secs_ago: u64, state: TxnState, ops: Vec<DocKey>) -> TxnDoc {
        let at = SystemTime::now() - Duration::from_secs(secs_ago);
        TxnDoc {
            id: ObjectId::generate(at),
            state,
            nonce: "00c0ffee".to_string(),
            ops,
        }
    }

    fn drain<T>(mut cursor: BoxCursor<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(item) = cursor.next().unwrap() {
            out.push(item);
        }
        cursor.close().unwrap();
        out
    }

    #[test]
    fn test_queue_docs_skips_missing_ids() {
        let store = MemoryStore::new();
        store.insert_queue_doc("accounts", 0.into(), vec!["tok-a".to_string()]);

        let ids = vec![DocId::from(0), DocId::from(1)];
        let docs = drain(store.queue_docs("accounts", &ids, 100).unwrap());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, DocId::from(0));
        assert!(!docs[0].found_in_stash);
    }

    #[test]
    fn test_pull_preserves_survivor_order() {
        let store = MemoryStore::new();
        let id = DocId::from(0);
        store.insert_queue_doc(
            "accounts",
            id.clone(),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
        );

        store
            .pull_queue_tokens("accounts", &id, &["b".to_string(), "d".to_string()])
            .unwrap();
        assert_eq!(
            store.queue("accounts", &id).unwrap(),
            vec!["a".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_pull_is_idempotent() {
        let store = MemoryStore::new();
        let id = DocId::from(0);
        store.insert_queue_doc("accounts", id.clone(), vec!["a".into()]);

        let tokens = vec!["a".to_string()];
        store.pull_queue_tokens("accounts", &id, &tokens).unwrap();
        store.pull_queue_tokens("accounts", &id, &tokens).unwrap();
        assert!(store.queue("accounts", &id).unwrap().is_empty());
    }

    #[test]
    fn test_pull_missing_doc_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .pull_queue_tokens("accounts", &DocId::from(9), &["a".to_string()])
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);

        let key = StashKey::new("accounts", 9);
        let err = store
            .pull_stash_tokens("txns.stash", &key, &["a".to_string()])
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[test]
    fn test_select_txns_filters_and_sorts() {
        let store = MemoryStore::new();
        let old_applied = txn_at(3600, TxnState::Applied, vec![]);
        let old_pending = txn_at(3000, TxnState::Preparing, vec![]);
        let fresh_applied = txn_at(0, TxnState::Applied, vec![]);
        for doc in [&fresh_applied, &old_pending, &old_applied] {
            store.insert_txn(TXNS, doc.clone());
        }

        let cutoff = ObjectId::from_time(SystemTime::now() - Duration::from_secs(60));
        let selector = TxnSelector::completed_before(cutoff);
        let records = drain(store.select_txns(TXNS, &selector, 1000).unwrap());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, old_applied.id);

        let all = drain(store.select_txns(TXNS, &TxnSelector::completed(), 1000).unwrap());
        let ids: Vec<ObjectId> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![old_applied.id, fresh_applied.id]);
    }

    #[test]
    fn test_remove_txns_counts_actual_removals() {
        let store = MemoryStore::new();
        let a = txn_at(100, TxnState::Applied, vec![]);
        let b = txn_at(50, TxnState::Aborted, vec![]);
        store.insert_txn(TXNS, a.clone());
        store.insert_txn(TXNS, b.clone());

        let ghost = ObjectId::generate(SystemTime::now());
        let removed = store.remove_txns(TXNS, &[a.id, ghost]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.txn_ids(TXNS), vec![b.id]);
    }

    #[test]
    fn test_stash_docs_by_compound_key() {
        let store = MemoryStore::new();
        let key = StashKey::new("accounts", 9);
        let token = format_token(&ObjectId::generate(SystemTime::now()), "01234567");
        store.insert_stash_doc("txns.stash", key.clone(), vec![token.clone()]);

        let other = StashKey::new("accounts", 10);
        let docs = drain(
            store
                .stash_docs("txns.stash", &[key.clone(), other], 100)
                .unwrap(),
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, key);
        assert_eq!(docs[0].queue, vec![token]);
    }

    #[test]
    fn test_push_token_appends() {
        let store = MemoryStore::new();
        let id = DocId::from(0);
        store.push_queue_token("accounts", &id, "first");
        store.push_queue_token("accounts", &id, "second");
        assert_eq!(
            store.queue("accounts", &id).unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
    }
}
