//! Point-in-time peer summary for reporting.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short summary of a connected peer.
///
/// A copy: later head updates on the peer do not change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Negotiated protocol version.
    pub version: u32,
    /// Total difficulty of the peer's best chain.
    #[serde(with = "decimal")]
    pub difficulty: BigUint,
    /// Hash of the peer's best block, lowercase hex.
    pub head: String,
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{} head={} td={}", self.version, self.head, self.difficulty)
    }
}

/// Big integers as decimal strings.
mod decimal {
    use num_bigint::BigUint;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("invalid decimal integer: {}", s)))
    }
}
