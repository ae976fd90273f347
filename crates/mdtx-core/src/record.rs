//! Wire record types.
//!
//! The transactions collection stores `{_id, s, n, o}`; participating
//! documents carry a `txn-queue` array; stash entries are keyed by the
//! compound `{c, id}`. These field names are the stable contract between the
//! transaction runtime and the pruner.

use crate::key::{DocId, DocKey, StashKey};
use crate::oid::ObjectId;
use crate::token::format_token;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a transaction record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum TxnState {
    Preparing,
    Prepared,
    Aborting,
    Applying,
    Aborted,
    Applied,
}

impl TxnState {
    /// The integer code persisted in the `s` field.
    pub fn code(self) -> i32 {
        match self {
            TxnState::Preparing => 1,
            TxnState::Prepared => 2,
            TxnState::Aborting => 3,
            TxnState::Applying => 4,
            TxnState::Aborted => 5,
            TxnState::Applied => 6,
        }
    }

    /// Whether the transaction runtime is finished with this record.
    ///
    /// Only completed transactions are safe to prune once aged; every other
    /// state represents in-flight or prepared work whose content may change.
    pub fn is_completed(self) -> bool {
        matches!(self, TxnState::Aborted | TxnState::Applied)
    }
}

impl From<TxnState> for i32 {
    fn from(state: TxnState) -> Self {
        state.code()
    }
}

impl TryFrom<i32> for TxnState {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TxnState::Preparing),
            2 => Ok(TxnState::Prepared),
            3 => Ok(TxnState::Aborting),
            4 => Ok(TxnState::Applying),
            5 => Ok(TxnState::Aborted),
            6 => Ok(TxnState::Applied),
            other => Err(format!("unknown transaction state code {}", other)),
        }
    }
}

/// The projection of a transaction record the pruner reads: `_id` and the
/// referenced doc keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "o", default)]
    pub ops: Vec<DocKey>,
}

/// A full transaction record as persisted in the transactions collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "s")]
    pub state: TxnState,
    #[serde(rename = "n")]
    pub nonce: String,
    #[serde(rename = "o", default)]
    pub ops: Vec<DocKey>,
}

impl TxnDoc {
    /// The queue token this transaction attempt left in its documents.
    pub fn token(&self) -> String {
        format_token(&self.id, &self.nonce)
    }

    /// The pruner's projection of this record.
    pub fn record(&self) -> TxnRecord {
        TxnRecord {
            id: self.id,
            ops: self.ops.clone(),
        }
    }
}

/// The `{_id, txn-queue}` projection of a participating document.
///
/// Everything else about the document is unread. `found_in_stash` records
/// where the most recent read located it and never goes over the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDoc {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "txn-queue", default)]
    pub queue: Vec<String>,
    #[serde(skip)]
    pub found_in_stash: bool,
}

/// A stash entry: queue state for a document that does not currently exist
/// in its primary collection (awaiting insert, or after remove).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashDoc {
    #[serde(rename = "_id")]
    pub id: StashKey,
    #[serde(rename = "txn-queue", default)]
    pub queue: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::new_nonce;
    use serde_json::json;
    use std::time::SystemTime;

    #[test]
    fn test_completed_states() {
        assert!(TxnState::Applied.is_completed());
        assert!(TxnState::Aborted.is_completed());
        assert!(!TxnState::Preparing.is_completed());
        assert!(!TxnState::Prepared.is_completed());
        assert!(!TxnState::Aborting.is_completed());
        assert!(!TxnState::Applying.is_completed());
    }

    #[test]
    fn test_state_codes_roundtrip() {
        for code in 1..=6 {
            let state = TxnState::try_from(code).unwrap();
            assert_eq!(state.code(), code);
        }
        assert!(TxnState::try_from(0).is_err());
        assert!(TxnState::try_from(7).is_err());
    }

    #[test]
    fn test_txn_doc_wire_names() {
        let doc = TxnDoc {
            id: ObjectId::generate(SystemTime::now()),
            state: TxnState::Applied,
            nonce: "0badcafe".to_string(),
            ops: vec![DocKey::new("accounts", 0)],
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": {"$oid": doc.id.to_hex()},
                "s": 6,
                "n": "0badcafe",
                "o": [{"c": "accounts", "d": 0}],
            })
        );
    }

    #[test]
    fn test_queue_doc_wire_names() {
        let doc = QueueDoc {
            id: 7.into(),
            queue: vec!["aaaabbbbccccddddeeeeffff_01234567".to_string()],
            found_in_stash: true,
        };
        let value = serde_json::to_value(&doc).unwrap();
        // found_in_stash is in-memory only.
        assert_eq!(
            value,
            json!({
                "_id": 7,
                "txn-queue": ["aaaabbbbccccddddeeeeffff_01234567"],
            })
        );
        let back: QueueDoc = serde_json::from_value(value).unwrap();
        assert!(!back.found_in_stash);
    }

    #[test]
    fn test_stash_doc_compound_id() {
        let doc = StashDoc {
            id: StashKey::new("accounts", 9),
            queue: vec![],
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": {"c": "accounts", "id": 9},
                "txn-queue": [],
            })
        );
    }

    #[test]
    fn test_token_matches_record() {
        let doc = TxnDoc {
            id: ObjectId::generate(SystemTime::now()),
            state: TxnState::Applied,
            nonce: new_nonce(),
            ops: vec![],
        };
        assert_eq!(crate::token_to_txn_id(&doc.token()), doc.id);
    }
}
