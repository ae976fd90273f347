//! The incremental prune engine.
//!
//! Streams aged completed transactions in ascending `_id` order, resolves
//! every document they reference, pulls the dead tokens out of `txn-queue`
//! fields, and bulk-deletes the transaction records, one bounded batch at a
//! time, while the live transaction runtime keeps mutating the same
//! collections. Memory is bounded by the batch size and the document cache;
//! no in-memory graph of documents and transactions is ever assembled.

use crate::cache::DocCache;
use crate::log::{LogSink, TracingSink};
use crate::resolver::DocResolver;
use crate::stats::PrunerStats;
use mdtx_core::{token_to_txn_id, DocKey, ObjectId, QueueDoc, StashKey, TxnRecord};
use mdtx_store::{Cursor, DocStore, StoreError, TxnSelector};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Transactions consumed per batch; also bounds the bulk-delete size.
pub const PRUNE_TXN_BATCH_SIZE: usize = 1000;

/// Driver batch size for document lookups.
pub const QUERY_DOC_BATCH_SIZE: usize = 100;

/// Capacity of the document cache.
pub const PRUNE_DOC_CACHE_SIZE: usize = 10_000;

/// Suffix appended to the transactions collection name to address the
/// stash.
const STASH_SUFFIX: &str = ".stash";

/// Interval between progress log lines.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(15);

/// Errors that can abort a prune run.
#[derive(Error, Debug)]
pub enum PruneError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PruneError>;

/// Tuning knobs for the engine. The defaults are the values a host wires
/// through when it has no opinion.
#[derive(Clone, Debug)]
pub struct PruneConfig {
    /// Transactions per batch.
    pub txn_batch_size: usize,
    /// Driver batch size for document lookups.
    pub doc_batch_size: usize,
    /// Document cache capacity.
    pub doc_cache_size: usize,
}

impl Default for PruneConfig {
    fn default() -> Self {
        PruneConfig {
            txn_batch_size: PRUNE_TXN_BATCH_SIZE,
            doc_batch_size: QUERY_DOC_BATCH_SIZE,
            doc_cache_size: PRUNE_DOC_CACHE_SIZE,
        }
    }
}

/// What to prune.
#[derive(Clone, Debug)]
pub struct PruneArgs {
    /// Name of the transactions collection. The stash is addressed as
    /// `"<name>.stash"`.
    pub txns_collection: String,
    /// Only transactions older than this are considered.
    pub max_age: Duration,
}

impl PruneArgs {
    pub fn new(txns_collection: impl Into<String>, max_age: Duration) -> Self {
        PruneArgs {
            txns_collection: txns_collection.into(),
            max_age,
        }
    }
}

/// Fires at most once per interval; drives the advisory progress log.
struct SimpleTimer {
    interval: Duration,
    next: Instant,
}

impl SimpleTimer {
    fn new(interval: Duration) -> Self {
        SimpleTimer {
            interval,
            next: Instant::now() + interval,
        }
    }

    fn is_after(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.next {
            self.next = now + self.interval;
            true
        } else {
            false
        }
    }
}

/// Reads the transactions collection incrementally, removing each batch of
/// aged completed transactions once their documents are provably clean.
///
/// Holds the document cache and the statistics across batches; a single
/// pruner instance is assumed to be active per transactions collection.
pub struct IncrementalPruner {
    cache: DocCache,
    stats: PrunerStats,
    config: PruneConfig,
    sink: Box<dyn LogSink>,
}

impl IncrementalPruner {
    /// Create a pruner with default configuration, logging through
    /// `tracing`.
    pub fn new() -> Self {
        Self::with_config(PruneConfig::default())
    }

    /// Create a pruner with custom configuration.
    pub fn with_config(config: PruneConfig) -> Self {
        Self::with_sink(config, Box::new(TracingSink))
    }

    /// Create a pruner reporting through a caller-supplied sink.
    pub fn with_sink(config: PruneConfig, sink: Box<dyn LogSink>) -> Self {
        IncrementalPruner {
            cache: DocCache::new(config.doc_cache_size),
            stats: PrunerStats::default(),
            config,
            sink,
        }
    }

    /// Statistics accumulated so far. Remains readable after a failed run,
    /// so partial progress is always observable.
    pub fn stats(&self) -> &PrunerStats {
        &self.stats
    }

    /// The configuration in effect.
    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    /// Run one prune pass over `args.txns_collection`.
    ///
    /// Streams every completed transaction older than `args.max_age` and
    /// prunes batch by batch until the cursor is exhausted. On a driver
    /// error the cursor is closed best-effort and the error is returned;
    /// the statistics keep whatever was counted before the failure.
    pub fn prune<S: DocStore>(&mut self, store: &S, args: &PruneArgs) -> Result<PrunerStats> {
        let started = Instant::now();
        let stash_collection = format!("{}{}", args.txns_collection, STASH_SUFFIX);
        let threshold = SystemTime::now()
            .checked_sub(args.max_age)
            .unwrap_or(UNIX_EPOCH);
        let selector = TxnSelector::completed_before(ObjectId::from_time(threshold));
        let mut cursor = store.select_txns(
            &args.txns_collection,
            &selector,
            self.config.txn_batch_size,
        )?;
        let mut timer = SimpleTimer::new(PROGRESS_INTERVAL);

        loop {
            let done = match self.prune_next_batch(
                store,
                cursor.as_mut(),
                &args.txns_collection,
                &stash_collection,
            ) {
                Ok(done) => done,
                Err(err) => {
                    if let Err(close_err) = cursor.close() {
                        self.sink
                            .warning(&format!("ignoring cursor close error: {}", close_err));
                    }
                    return Err(err);
                }
            };
            if done {
                break;
            }
            if timer.is_after() {
                self.sink.debug(&format!(
                    "pruning has removed {} txns, handling {} docs ({} in cache)",
                    self.stats.txns_removed,
                    self.stats.doc_cache_hits + self.stats.doc_cache_misses,
                    self.stats.doc_cache_hits
                ));
            }
        }
        cursor.close().map_err(PruneError::Store)?;

        self.sink.info(&format!(
            "pruning removed {} txns and cleaned {} docs in {}ms.",
            self.stats.txns_removed,
            self.stats.doc_queues_cleaned,
            started.elapsed().as_millis()
        ));
        Ok(self.stats.clone())
    }

    /// Prune one batch of transactions from `cursor`.
    ///
    /// Returns `true` iff the cursor was exhausted within this batch. On
    /// success, every removed transaction had all of its documents cleaned;
    /// transactions whose documents could not be located are preserved.
    pub fn prune_next_batch<S: DocStore>(
        &mut self,
        store: &S,
        cursor: &mut dyn Cursor<Item = TxnRecord>,
        txns_collection: &str,
        stash_collection: &str,
    ) -> Result<bool> {
        // Collect the batch and the identities it references.
        let mut done = false;
        let mut txns: Vec<TxnRecord> = Vec::with_capacity(self.config.txn_batch_size);
        let mut docs_to_check: HashSet<DocKey> = HashSet::new();
        let mut txns_being_cleaned: HashSet<ObjectId> = HashSet::new();
        while txns.len() < self.config.txn_batch_size {
            match cursor.next().map_err(PruneError::Store)? {
                Some(txn) => {
                    for key in &txn.ops {
                        docs_to_check.insert(key.clone());
                    }
                    txns_being_cleaned.insert(txn.id);
                    txns.push(txn);
                }
                None => {
                    done = true;
                    break;
                }
            }
        }

        let mut docs = DocResolver::new(
            store,
            &mut self.cache,
            &mut self.stats,
            self.config.doc_batch_size,
        )
        .lookup_docs(stash_collection, &docs_to_check)?;

        let mut txns_to_delete: Vec<ObjectId> = Vec::with_capacity(txns.len());
        for txn in &txns {
            let mut removable = true;
            for key in &txn.ops {
                match self.clean_doc(
                    store,
                    stash_collection,
                    txn.id,
                    key,
                    &txns_being_cleaned,
                    &mut docs,
                )? {
                    CleanOutcome::Cleaned | CleanOutcome::AlreadyClean => {}
                    CleanOutcome::DocMissing => removable = false,
                }
            }
            if removable {
                txns_to_delete.push(txn.id);
            } else {
                self.stats.txns_not_removed += 1;
            }
        }

        if !txns_to_delete.is_empty() {
            let removed = store.remove_txns(txns_collection, &txns_to_delete)?;
            self.stats.txns_removed += removed;
        }
        Ok(done)
    }

    /// Pull this batch's tokens from one document referenced by `txn_id`.
    fn clean_doc<S: DocStore>(
        &mut self,
        store: &S,
        stash_collection: &str,
        txn_id: ObjectId,
        key: &DocKey,
        txns_being_cleaned: &HashSet<ObjectId>,
        docs: &mut HashMap<DocKey, QueueDoc>,
    ) -> Result<CleanOutcome> {
        let Some(doc) = docs.get(key) else {
            // Usually a sign of corruption upstream; for pruning it is just
            // a transaction that cannot be cleaned up.
            self.sink.warning(&format!(
                "transaction {} referenced document {} but it could not be found",
                txn_id, key
            ));
            return Ok(CleanOutcome::DocMissing);
        };

        let mut tokens_to_pull = Vec::new();
        let mut new_queue = Vec::new();
        for token in &doc.queue {
            if txns_being_cleaned.contains(&token_to_txn_id(token)) {
                tokens_to_pull.push(token.clone());
            } else {
                new_queue.push(token.clone());
            }
        }
        if tokens_to_pull.is_empty() {
            // Already clean of the transactions in this batch.
            self.stats.docs_already_clean += 1;
            return Ok(CleanOutcome::AlreadyClean);
        }
        let updated = QueueDoc {
            id: doc.id.clone(),
            queue: new_queue,
            found_in_stash: doc.found_in_stash,
        };

        match store.pull_queue_tokens(&key.collection, &key.doc_id, &tokens_to_pull) {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                // The document moved since resolution; retry the identical
                // pull against the stash under the transformed key.
                let stash_key = StashKey::from(key.clone());
                match store.pull_stash_tokens(stash_collection, &stash_key, &tokens_to_pull) {
                    Ok(()) => {}
                    Err(StoreError::NotFound) => {
                        self.sink.warning(&format!(
                            "trying to clean up doc {}, could not be found in collection nor stash",
                            key
                        ));
                        return Ok(CleanOutcome::DocMissing);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Err(err) => return Err(err.into()),
        }

        self.stats.doc_tokens_cleaned += tokens_to_pull.len() as u64;
        self.stats.doc_queues_cleaned += 1;
        // Later transactions in this batch must observe the post-pull queue
        // rather than re-pull the same tokens.
        self.cache.put(key.clone(), updated.clone());
        docs.insert(key.clone(), updated);
        Ok(CleanOutcome::Cleaned)
    }
}

impl Default for IncrementalPruner {
    fn default() -> Self {
        Self::new()
    }
}

enum CleanOutcome {
    /// Tokens were pulled from the document.
    Cleaned,
    /// The queue held nothing for this batch.
    AlreadyClean,
    /// The document was found nowhere; its transaction must be preserved.
    DocMissing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PruneConfig::default();
        assert_eq!(config.txn_batch_size, 1000);
        assert_eq!(config.doc_batch_size, 100);
        assert_eq!(config.doc_cache_size, 10_000);
    }

    #[test]
    fn test_simple_timer_fires_after_interval() {
        let mut timer = SimpleTimer::new(Duration::ZERO);
        assert!(timer.is_after());

        let mut slow = SimpleTimer::new(Duration::from_secs(3600));
        assert!(!slow.is_after());
    }

    #[test]
    fn test_prune_args() {
        let args = PruneArgs::new("txns", Duration::from_secs(3600));
        assert_eq!(args.txns_collection, "txns");
        assert_eq!(args.max_age, Duration::from_secs(3600));
    }
}
