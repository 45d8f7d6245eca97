//! Seele protocol messages.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::peer::Hash;

/// Chain status exchanged once in each direction during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMessage {
    /// Sender's protocol version.
    pub protocol_version: u32,
    /// Network the sender belongs to.
    pub network_id: u64,
    /// Hash of the sender's block at height 0.
    pub genesis_hash: Hash,
    /// Hash of the sender's best block.
    pub head_hash: Hash,
    /// Cumulative difficulty of the sender's best chain.
    pub total_difficulty: BigUint,
}

/// Announcement of a new best block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewBlockMessage {
    /// Block hash.
    pub hash: Hash,
    /// Total difficulty of the chain ending at this block.
    pub total_difficulty: BigUint,
    /// Encoded block, opaque to this layer.
    pub payload: Vec<u8>,
}

/// Announcement of a new transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTransactionMessage {
    /// Transaction hash.
    pub hash: Hash,
    /// Encoded transaction, opaque to this layer.
    pub payload: Vec<u8>,
}

/// All Seele protocol messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Message {
    // Handshake
    /// Chain status, sent first by both sides.
    Status(StatusMessage),

    /// Closing notice carrying a numeric disconnect reason.
    Disconnect(u64),

    // Gossip
    /// Announce a new block.
    NewBlock(NewBlockMessage),
    /// Announce a new transaction.
    NewTransaction(NewTransactionMessage),

    // Keepalive
    /// Ping with a nonce.
    Ping(u64),
    /// Pong echoing the nonce.
    Pong(u64),
}

impl Message {
    /// Get a human-readable name for the message type.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Status(_) => "status",
            Message::Disconnect(_) => "disconnect",
            Message::NewBlock(_) => "newblock",
            Message::NewTransaction(_) => "newtx",
            Message::Ping(_) => "ping",
            Message::Pong(_) => "pong",
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Status(s) => write!(
                f,
                "Status(version={}, network={}, td={})",
                s.protocol_version, s.network_id, s.total_difficulty
            ),
            Message::Disconnect(code) => write!(f, "Disconnect({})", code),
            Message::NewBlock(b) => write!(
                f,
                "NewBlock(hash={}, td={})",
                hex::encode(&b.hash[..8]),
                b.total_difficulty
            ),
            Message::NewTransaction(t) => {
                write!(f, "NewTransaction(hash={})", hex::encode(&t.hash[..8]))
            }
            Message::Ping(n) => write!(f, "Ping({})", n),
            Message::Pong(n) => write!(f, "Pong({})", n),
        }
    }
}
