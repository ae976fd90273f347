//! Time-ordered object ids.
//!
//! An `ObjectId` is 12 bytes: 4 bytes of big-endian UNIX seconds followed by
//! 8 random bytes. Byte order therefore equals creation-time order, which is
//! what ascending `_id` scans over the transactions collection rely on.

use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A 12-byte time-ordered identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh id stamped with the given wall-clock time.
    pub fn generate(at: SystemTime) -> Self {
        let mut bytes = Self::time_prefix(at);
        rand::thread_rng().fill(&mut bytes[4..]);
        ObjectId(bytes)
    }

    /// The smallest id carrying the given timestamp.
    ///
    /// Used as an exclusive upper bound: `id < ObjectId::from_time(t)` holds
    /// exactly for ids generated strictly before `t`'s second.
    pub fn from_time(at: SystemTime) -> Self {
        ObjectId(Self::time_prefix(at))
    }

    /// Create an id from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// The zero id. Never generated; malformed tokens decode to it.
    pub fn zero() -> Self {
        ObjectId([0u8; 12])
    }

    /// Check if this is the zero id.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 12]
    }

    /// The largest possible id; upper bound that excludes nothing.
    pub fn max() -> Self {
        ObjectId([0xffu8; 12])
    }

    /// The wall-clock second embedded in the id.
    pub fn timestamp(&self) -> SystemTime {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        UNIX_EPOCH + Duration::from_secs(u64::from(secs))
    }

    /// Convert to the 24-character lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse the 24-character hex form.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 24 {
            return None;
        }
        let mut bytes = [0u8; 12];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex_str = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(hex_str, 16).ok()?;
        }
        Some(ObjectId(bytes))
    }

    fn time_prefix(at: SystemTime) -> [u8; 12] {
        let secs = at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
            .min(u64::from(u32::MAX)) as u32;
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::zero()
    }
}

// The wire form is the extended-JSON map `{"$oid": "<hex>"}`, never a bare
// string, so an object id cannot be confused with a string document id that
// happens to be 24 hex characters.
impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$oid", &self.to_hex())?;
        map.end()
    }
}

#[derive(Deserialize)]
struct OidRepr {
    #[serde(rename = "$oid")]
    hex: String,
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = OidRepr::deserialize(deserializer)?;
        ObjectId::from_hex(&repr.hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid object id: {:?}", repr.hex)))
    }
}
