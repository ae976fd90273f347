//! Prune-run statistics.

use serde::{Deserialize, Serialize};

/// Counters accumulated over a prune run.
///
/// Mutated from a single execution context, so no atomic discipline is
/// needed. The record stays readable through
/// [`IncrementalPruner::stats`](crate::IncrementalPruner::stats) even when a
/// run fails partway, so callers can observe partial progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunerStats {
    /// Document lookups answered from the LRU cache.
    pub doc_cache_hits: u64,
    /// Document lookups that had to go to the database.
    pub doc_cache_misses: u64,
    /// Batched queries issued against primary collections.
    pub collection_queries: u64,
    /// Documents read back from primary collections.
    pub doc_reads: u64,
    /// Documents absent from their primary collection after the primary
    /// pass.
    pub doc_still_missing: u64,
    /// Batched queries issued against the stash.
    pub stash_queries: u64,
    /// Documents read back from the stash.
    pub stash_reads: u64,
    /// Documents that had dead tokens pulled from their queue.
    pub doc_queues_cleaned: u64,
    /// Total tokens pulled across all documents.
    pub doc_tokens_cleaned: u64,
    /// Documents whose queues held no tokens for the current batch.
    pub docs_already_clean: u64,
    /// Transaction records deleted.
    pub txns_removed: u64,
    /// Transactions left in place because a document could not be cleaned.
    pub txns_not_removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_zero() {
        let stats = PrunerStats::default();
        assert_eq!(stats.txns_removed, 0);
        assert_eq!(stats.doc_cache_hits + stats.doc_cache_misses, 0);
    }
}
