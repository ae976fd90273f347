//! Queue-token codec.
//!
//! Every document participating in a transaction carries a `txn-queue` field
//! of tokens shaped `"<24-hex-txid>_<nonce>"`. Only the id prefix matters to
//! the pruner; the nonce distinguishes retry attempts of the same
//! transaction.

use crate::oid::ObjectId;
use rand::Rng;

/// Width of the transaction-id prefix in a queue token.
pub const TOKEN_ID_HEX_LEN: usize = 24;

/// Extract the transaction id from a queue token.
///
/// Takes the substring up to the first `'_'`. A prefix that is not exactly
/// 24 hex characters yields the zero id, which matches no live transaction,
/// so malformed tokens are preserved in queues rather than rejected.
pub fn token_to_txn_id(token: &str) -> ObjectId {
    let prefix = match token.find('_') {
        Some(idx) => &token[..idx],
        None => token,
    };
    if prefix.len() != TOKEN_ID_HEX_LEN {
        return ObjectId::zero();
    }
    ObjectId::from_hex(prefix).unwrap_or_else(ObjectId::zero)
}

/// Build the token for one attempt of a transaction.
pub fn format_token(id: &ObjectId, nonce: &str) -> String {
    format!("{}_{}", id.to_hex(), nonce)
}

/// Generate a fresh 8-hex-char attempt nonce.
pub fn new_nonce() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn test_token_roundtrip() {
        let id = ObjectId::generate(SystemTime::now());
        let token = format_token(&id, "56780123");
        assert_eq!(token_to_txn_id(&token), id);
    }

    #[test]
    fn test_nonce_does_not_matter() {
        let id = ObjectId::generate(SystemTime::now());
        let real = format_token(&id, &new_nonce());
        let fake = format_token(&id, "deadbeef");
        assert_eq!(token_to_txn_id(&real), token_to_txn_id(&fake));
    }

    #[test]
    fn test_bare_hex_without_separator() {
        let id = ObjectId::generate(SystemTime::now());
        assert_eq!(token_to_txn_id(&id.to_hex()), id);
    }

    #[test]
    fn test_malformed_tokens_decode_to_zero() {
        assert!(token_to_txn_id("").is_zero());
        assert!(token_to_txn_id("_deadbeef").is_zero());
        assert!(token_to_txn_id("0123_nonce").is_zero());
        assert!(token_to_txn_id("not-hex-but-24-chars-xxx_n").is_zero());
        // Too long a prefix.
        assert!(token_to_txn_id("0123456789abcdef0123456789_n").is_zero());
    }

    #[test]
    fn test_only_first_separator_counts() {
        let id = ObjectId::generate(SystemTime::now());
        let token = format_token(&id, "nonce_with_underscores");
        assert_eq!(token_to_txn_id(&token), id);
    }

    #[test]
    fn test_new_nonce_shape() {
        let nonce = new_nonce();
        assert_eq!(nonce.len(), 8);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
