//! Deterministic bincode configuration for wire frames.
//!
//! Uses fixed-size integer encoding and little-endian byte order
//! for consistent cross-platform serialization.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{P2pError, P2pResult};

/// Fixed-int, little-endian, trailing bytes rejected.
fn config() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Serialize a value to bytes.
pub fn serialize<T: Serialize>(value: &T) -> P2pResult<Vec<u8>> {
    config()
        .serialize(value)
        .map_err(|e| P2pError::Serialization(e.to_string()))
}

/// Encoded size of a value in bytes, without allocating the encoding.
pub fn serialized_size<T: Serialize>(value: &T) -> P2pResult<usize> {
    config()
        .serialized_size(value)
        .map(|size| size as usize)
        .map_err(|e| P2pError::Serialization(e.to_string()))
}

/// Deserialize a value from bytes.
///
/// Fails on malformed input and on trailing bytes after the value.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> P2pResult<T> {
    config()
        .deserialize(bytes)
        .map_err(|e| P2pError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixint_little_endian() {
        let bytes = serialize(&0x0102_0304u32).unwrap();
        assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_serialized_size_matches_encoding() {
        let value = (7u64, vec![1u8, 2, 3]);
        assert_eq!(serialized_size(&value).unwrap(), serialize(&value).unwrap().len());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = serialize(&7u64).unwrap();
        bytes.push(0xFF);

        let result: P2pResult<u64> = deserialize(&bytes);
        assert!(matches!(result, Err(P2pError::Serialization(_))));
    }
}
