//! Completed-transaction oracle.
//!
//! Classifies queue tokens against the set of completed transaction ids.
//! The prune engine never asks (its cursor is already filtered to
//! completed, aged records), but the surrounding runtime's cleanup passes
//! need to know which tokens in a live queue belong to finished
//! transactions.

use crate::pruner::{PruneError, Result, PRUNE_TXN_BATCH_SIZE};
use mdtx_core::{token_to_txn_id, ObjectId};
use mdtx_store::{DocStore, TxnSelector};
use std::collections::btree_set;
use std::collections::{BTreeSet, HashMap};

/// Answers "is this token's transaction completed?" for batches of tokens.
pub trait Oracle {
    /// Number of completed transactions known to the oracle.
    fn count(&self) -> usize;

    /// Map each token whose id prefix is a known completed transaction to
    /// `true`. Tokens of pending or unknown transactions are absent from
    /// the result; the nonce is ignored, so every attempt's token of a
    /// completed transaction qualifies.
    fn completed_tokens(&self, tokens: &[String]) -> Result<HashMap<String, bool>>;

    /// Forget transactions, typically after the pruner has deleted them.
    fn remove_txns(&mut self, ids: &[ObjectId]) -> Result<()>;

    /// Iterate the known ids in ascending order.
    fn iter_txns(&self) -> TxnIdIter<'_>;
}

/// Oracle backed by an in-memory snapshot of the transactions collection.
pub struct MemOracle {
    completed: BTreeSet<ObjectId>,
}

impl MemOracle {
    /// Load every completed transaction id from the collection, regardless
    /// of age.
    pub fn load<S: DocStore>(store: &S, txns_collection: &str) -> Result<Self> {
        let selector = TxnSelector::completed();
        let mut cursor = store
            .select_txns(txns_collection, &selector, PRUNE_TXN_BATCH_SIZE)
            .map_err(PruneError::Store)?;
        let mut completed = BTreeSet::new();
        loop {
            match cursor.next() {
                Ok(Some(txn)) => {
                    completed.insert(txn.id);
                }
                Ok(None) => break,
                Err(err) => {
                    let _ = cursor.close();
                    return Err(err.into());
                }
            }
        }
        cursor.close().map_err(PruneError::Store)?;
        Ok(MemOracle { completed })
    }
}

impl Oracle for MemOracle {
    fn count(&self) -> usize {
        self.completed.len()
    }

    fn completed_tokens(&self, tokens: &[String]) -> Result<HashMap<String, bool>> {
        let mut out = HashMap::new();
        for token in tokens {
            if self.completed.contains(&token_to_txn_id(token)) {
                out.insert(token.clone(), true);
            }
        }
        Ok(out)
    }

    fn remove_txns(&mut self, ids: &[ObjectId]) -> Result<()> {
        for id in ids {
            self.completed.remove(id);
        }
        Ok(())
    }

    fn iter_txns(&self) -> TxnIdIter<'_> {
        TxnIdIter {
            inner: self.completed.iter(),
        }
    }
}

/// Ascending iterator over an oracle's known transaction ids.
pub struct TxnIdIter<'a> {
    inner: btree_set::Iter<'a, ObjectId>,
}

impl Iterator for TxnIdIter<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        self.inner.next().copied()
    }
}
