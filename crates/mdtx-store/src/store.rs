//! The document-store driver seam.
//!
//! The prune engine addresses the database through [`DocStore`]; the trait
//! is shaped by exactly the operations the engine performs, so a binding to
//! a real driver stays thin. All methods block; the engine is
//! single-threaded cooperative and issues one database operation at a time.

use crate::cursor::BoxCursor;
use crate::error::Result;
use mdtx_core::{DocId, ObjectId, QueueDoc, StashDoc, StashKey, TxnRecord, TxnState};

/// Which transaction records a scan should return.
///
/// Built by the caller so the completed-and-aged predicate stays with the
/// engine; the store only evaluates it.
#[derive(Clone, Debug)]
pub struct TxnSelector {
    /// Transaction states to match.
    pub states: Vec<TxnState>,
    /// Exclusive upper bound on `_id`, and therefore on creation time.
    pub id_below: ObjectId,
}

impl TxnSelector {
    /// Completed transactions (applied or aborted) of any age.
    pub fn completed() -> Self {
        TxnSelector {
            states: vec![TxnState::Aborted, TxnState::Applied],
            id_below: ObjectId::max(),
        }
    }

    /// Completed transactions whose ids are strictly below `cutoff`.
    pub fn completed_before(cutoff: ObjectId) -> Self {
        TxnSelector {
            id_below: cutoff,
            ..TxnSelector::completed()
        }
    }

    /// Whether a record with this state and id matches.
    pub fn matches(&self, state: TxnState, id: &ObjectId) -> bool {
        self.states.contains(&state) && *id < self.id_below
    }
}

/// Handle to the database underneath the transaction layer.
pub trait DocStore {
    /// Stream `{_id, txn-queue}` projections for the given ids from a
    /// primary collection. Ids with no document are simply absent from the
    /// stream. `batch` is the driver fetch size.
    fn queue_docs(
        &self,
        collection: &str,
        ids: &[DocId],
        batch: usize,
    ) -> Result<BoxCursor<QueueDoc>>;

    /// Stream stash entries for the given stash keys. Keys with no entry
    /// are absent from the stream.
    fn stash_docs(
        &self,
        collection: &str,
        keys: &[StashKey],
        batch: usize,
    ) -> Result<BoxCursor<StashDoc>>;

    /// Stream `{_id, o}` projections of the transactions matching
    /// `selector`, in ascending `_id` order.
    fn select_txns(
        &self,
        collection: &str,
        selector: &TxnSelector,
        batch: usize,
    ) -> Result<BoxCursor<TxnRecord>>;

    /// Pull the given tokens from a primary document's `txn-queue`,
    /// preserving the order of the survivors. Pulling tokens that are
    /// already absent is a no-op; `StoreError::NotFound` means no document
    /// has this id.
    fn pull_queue_tokens(&self, collection: &str, id: &DocId, tokens: &[String]) -> Result<()>;

    /// Same pull against a stash entry, addressed by its compound key.
    fn pull_stash_tokens(&self, collection: &str, key: &StashKey, tokens: &[String])
        -> Result<()>;

    /// Bulk-delete transaction records. Returns how many were removed,
    /// which may be fewer than requested if some ids were already gone.
    fn remove_txns(&self, collection: &str, ids: &[ObjectId]) -> Result<u64>;
}
