//! # mdtx-core
//!
//! Core types shared across the mdtx transaction layer:
//!
//! - [`ObjectId`]: 12-byte time-ordered identifiers for transaction records
//! - Queue tokens: the `"<txid-hex>_<nonce>"` strings embedded in documents
//! - [`DocId`], [`DocKey`], [`StashKey`]: opaque document addressing
//! - Wire record types for the transactions, primary and stash collections
//!
//! Field names carried by the record types (`_id`, `s`, `n`, `o`, `c`, `d`,
//! `id`, `txn-queue`) are a stable on-wire contract; everything else about a
//! stored document is opaque to this layer.

mod key;
mod oid;
mod record;
mod token;

pub use key::{DocId, DocKey, StashKey};
pub use oid::ObjectId;
pub use record::{QueueDoc, StashDoc, TxnDoc, TxnRecord, TxnState};
pub use token::{format_token, new_nonce, token_to_txn_id, TOKEN_ID_HEX_LEN};
