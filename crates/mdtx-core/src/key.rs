//! Opaque document addressing.
//!
//! A document id may be an integer, a string, an object id, or a compound
//! value. The transaction layer never interprets ids beyond structural
//! equality and database round-tripping.

use crate::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An opaque document id.
///
/// Serialized untagged, so the wire form is the natural scalar or map.
/// Decode is variant-stable: object ids carry their `{"$oid": ...}` wrapper
/// on the wire, so a string id that happens to look like hex stays a string
/// across a round trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    /// Integer id.
    Int(i64),
    /// Object id.
    Object(ObjectId),
    /// String id.
    Str(String),
    /// Compound id (ordered field map).
    Compound(BTreeMap<String, DocId>),
}

impl From<i64> for DocId {
    fn from(v: i64) -> Self {
        DocId::Int(v)
    }
}

impl From<&str> for DocId {
    fn from(v: &str) -> Self {
        DocId::Str(v.to_string())
    }
}

impl From<String> for DocId {
    fn from(v: String) -> Self {
        DocId::Str(v)
    }
}

impl From<ObjectId> for DocId {
    fn from(v: ObjectId) -> Self {
        DocId::Object(v)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Int(v) => write!(f, "{}", v),
            DocId::Object(v) => write!(f, "{}", v),
            DocId::Str(v) => write!(f, "{:?}", v),
            DocId::Compound(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Address of a document in its primary collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocKey {
    /// Primary collection name.
    #[serde(rename = "c")]
    pub collection: String,
    /// Document id within the collection.
    #[serde(rename = "d")]
    pub doc_id: DocId,
}

impl DocKey {
    pub fn new(collection: impl Into<String>, doc_id: impl Into<DocId>) -> Self {
        DocKey {
            collection: collection.into(),
            doc_id: doc_id.into(),
        }
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.collection, self.doc_id)
    }
}

/// Address of a stash entry: the `_id` of a stash document.
///
/// Isomorphic to [`DocKey`] but serialized under different field names; the
/// stash keys entries by `{c, id}` while transaction op lists use `{c, d}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StashKey {
    /// Primary collection the document belongs to.
    #[serde(rename = "c")]
    pub collection: String,
    /// Document id within that collection.
    #[serde(rename = "id")]
    pub id: DocId,
}

impl StashKey {
    pub fn new(collection: impl Into<String>, id: impl Into<DocId>) -> Self {
        StashKey {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl From<DocKey> for StashKey {
    fn from(key: DocKey) -> Self {
        StashKey {
            collection: key.collection,
            id: key.doc_id,
        }
    }
}

impl From<StashKey> for DocKey {
    fn from(key: StashKey) -> Self {
        DocKey {
            collection: key.collection,
            doc_id: key.id,
        }
    }
}

impl fmt::Display for StashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.collection, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn test_doc_id_structural_equality() {
        assert_eq!(DocId::from(0), DocId::Int(0));
        assert_eq!(DocId::from("alpha"), DocId::Str("alpha".to_string()));
        assert_ne!(DocId::from(0), DocId::from("0"));

        let id = ObjectId::generate(SystemTime::now());
        assert_eq!(DocId::from(id), DocId::Object(id));
    }

    #[test]
    fn test_compound_ids_compare_by_fields() {
        let mut a = BTreeMap::new();
        a.insert("region".to_string(), DocId::from("eu"));
        a.insert("seq".to_string(), DocId::from(7));
        let mut b = BTreeMap::new();
        b.insert("seq".to_string(), DocId::from(7));
        b.insert("region".to_string(), DocId::from("eu"));
        assert_eq!(DocId::Compound(a), DocId::Compound(b));
    }

    #[test]
    fn test_hex_shaped_string_id_round_trips_as_str() {
        // Exactly 24 lowercase hex chars, the same shape as an encoded
        // object id.
        let id = DocId::from("0123456789abcdef01234567");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0123456789abcdef01234567\"");
        let back: DocId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_object_id_round_trips_as_object() {
        let oid = ObjectId::generate(SystemTime::now());
        let id = DocId::Object(oid);
        let value = serde_json::to_value(&id).unwrap();
        assert_eq!(value, serde_json::json!({"$oid": oid.to_hex()}));
        let back: DocId = serde_json::from_value(value).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_key_shapes_are_isomorphic() {
        let key = DocKey::new("accounts", 3);
        let stash: StashKey = key.clone().into();
        assert_eq!(stash, StashKey::new("accounts", 3));
        let back: DocKey = stash.into();
        assert_eq!(back, key);
    }

    #[test]
    fn test_wire_field_names() {
        let key = DocKey::new("accounts", 3);
        assert_eq!(
            serde_json::to_value(&key).unwrap(),
            serde_json::json!({"c": "accounts", "d": 3})
        );

        let stash = StashKey::new("accounts", 3);
        assert_eq!(
            serde_json::to_value(&stash).unwrap(),
            serde_json::json!({"c": "accounts", "id": 3})
        );
    }

    #[test]
    fn test_display_for_diagnostics() {
        assert_eq!(DocKey::new("accounts", 0).to_string(), "accounts[0]");
        assert_eq!(
            DocKey::new("accounts", "alice").to_string(),
            "accounts[\"alice\"]"
        );
    }
}
