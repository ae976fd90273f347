//! # mdtx-prune
//!
//! Incremental pruner for the mdtx transaction layer.
//!
//! This crate provides:
//! - [`IncrementalPruner`]: the batched pipeline that streams aged completed
//!   transactions, scrubs their tokens out of per-document `txn-queue`
//!   fields, and bulk-deletes the records
//! - [`DocCache`] / [`DocResolver`]: bounded three-tier document resolution
//!   (cache, primary collections, stash)
//! - [`PrunerStats`]: counters accumulated over a run
//! - [`Oracle`] / [`MemOracle`]: completed-token classification
//! - [`LogSink`]: the injected diagnostics seam
//!
//! ## Safety model
//!
//! The pruner runs while the live transaction runtime keeps mutating the
//! same collections. It only considers transactions that are already
//! completed and older than a caller-chosen threshold, so their content is
//! frozen; live writers only add tokens for newer transactions, and pulling
//! a token that is already gone is a no-op. A document found in neither its
//! primary collection nor the stash cannot be proven clean, so its
//! transaction is preserved rather than deleted.

mod cache;
mod log;
mod oracle;
mod pruner;
mod resolver;
mod stats;

pub use cache::DocCache;
pub use log::{LogSink, TracingSink};
pub use oracle::{MemOracle, Oracle, TxnIdIter};
pub use pruner::{
    IncrementalPruner, PruneArgs, PruneConfig, PruneError, Result, PRUNE_DOC_CACHE_SIZE,
    PRUNE_TXN_BATCH_SIZE, QUERY_DOC_BATCH_SIZE,
};
pub use resolver::DocResolver;
pub use stats::PrunerStats;
