//! Node and peer identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte block or transaction hash.
pub type Hash = [u8; 32];

/// Length of a transport-level node identity.
pub const NODE_ID_LEN: usize = 64;

/// Length of the peer identifier derived from a node identity.
pub const PEER_ID_LEN: usize = 8;

/// Public identity of a node as supplied by the transport.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; NODE_ID_LEN]);

impl NodeId {
    /// Wrap raw identity bytes.
    pub fn from_bytes(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded identity (128 characters, optional `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; NODE_ID_LEN];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// Registry key for sessions with this node.
    pub fn peer_id(&self) -> PeerId {
        PeerId::from_node_id(self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}..)", hex::encode(&self.0[..PEER_ID_LEN]))
    }
}

/// Short identifier of a peer: the first [`PEER_ID_LEN`] bytes of its node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub [u8; PEER_ID_LEN]);

impl PeerId {
    /// Derive the peer id from a node identity.
    pub fn from_node_id(node_id: &NodeId) -> Self {
        let mut id = [0u8; PEER_ID_LEN];
        id.copy_from_slice(&node_id.0[..PEER_ID_LEN]);
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_id(fill: u8) -> NodeId {
        let mut bytes = [fill; NODE_ID_LEN];
        bytes[0] = 0xde;
        bytes[1] = 0xad;
        NodeId::from_bytes(bytes)
    }

    #[test]
    fn test_peer_id_is_prefix() {
        let id = node_id(0x11).peer_id();
        assert_eq!(id.0, [0xde, 0xad, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11]);
        assert_eq!(id.to_string(), "dead111111111111");
    }

    #[test]
    fn test_peer_id_deterministic() {
        assert_eq!(node_id(3).peer_id(), node_id(3).peer_id());
        assert_ne!(node_id(3).peer_id(), node_id(4).peer_id());
    }

    #[test]
    fn test_node_id_hex() {
        let id = node_id(0xab);
        let parsed = NodeId::from_hex(&format!("0x{}", id)).unwrap();
        assert_eq!(parsed, id);

        assert!(NodeId::from_hex("abcd").is_err());
        assert!(NodeId::from_hex(&"zz".repeat(NODE_ID_LEN)).is_err());
    }
}
