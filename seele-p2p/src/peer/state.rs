//! Per-peer session state.

use std::fmt;

use num_bigint::BigUint;
use parking_lot::RwLock;

use crate::config::ProtocolConfig;
use crate::error::P2pResult;
use crate::peer::{Hash, ItemKind, KnownItemSet, NodeId, PeerHandle, PeerId, PeerInfo};
use crate::protocol::{DisconnectReason, Message, StatusMessage};

/// Head hash and total difficulty, always read and written together.
#[derive(Debug)]
struct ChainHead {
    hash: Hash,
    total_difficulty: BigUint,
}

/// State of a negotiated peer session.
///
/// Shared between the connection's receive loop, which updates the head,
/// and broadcast/sync code running elsewhere. `version` is fixed at
/// construction; only the head sits behind the lock.
pub struct PeerState {
    /// Connection capability.
    handle: PeerHandle,
    /// Registry key.
    id: PeerId,
    /// Negotiated protocol version.
    version: u32,
    /// Best block announced by the peer.
    head: RwLock<ChainHead>,
    /// Transaction hashes the peer is known to have.
    known_txs: KnownItemSet,
    /// Block hashes the peer is known to have.
    known_blocks: KnownItemSet,
}

impl PeerState {
    /// Create the state for a peer.
    pub fn new(
        handle: PeerHandle,
        version: u32,
        head: Hash,
        total_difficulty: BigUint,
        config: &ProtocolConfig,
    ) -> Self {
        Self {
            id: handle.peer_id(),
            handle,
            version,
            head: RwLock::new(ChainHead {
                hash: head,
                total_difficulty,
            }),
            known_txs: KnownItemSet::new(config.max_known_txs),
            known_blocks: KnownItemSet::new(config.max_known_blocks),
        }
    }

    /// Create the state from the status the peer declared in the handshake.
    pub fn from_status(handle: PeerHandle, status: &StatusMessage, config: &ProtocolConfig) -> Self {
        Self::new(
            handle,
            status.protocol_version,
            status.head_hash,
            status.total_difficulty.clone(),
            config,
        )
    }

    /// Registry key of this peer.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Full node identity of this peer.
    pub fn node_id(&self) -> &NodeId {
        self.handle.node_id()
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Copy of the current head hash and total difficulty.
    pub fn head(&self) -> (Hash, BigUint) {
        let head = self.head.read();
        (head.hash, head.total_difficulty.clone())
    }

    /// Replace the head hash and total difficulty.
    ///
    /// No ordering check: whether a lower difficulty is acceptable is the
    /// caller's decision.
    pub fn set_head(&self, hash: Hash, total_difficulty: BigUint) {
        let mut head = self.head.write();
        head.hash = hash;
        head.total_difficulty = total_difficulty;
    }

    /// Total difficulty only.
    pub fn total_difficulty(&self) -> BigUint {
        self.head.read().total_difficulty.clone()
    }

    /// Snapshot for reporting.
    pub fn info(&self) -> PeerInfo {
        let (hash, difficulty) = self.head();
        PeerInfo {
            version: self.version,
            difficulty,
            head: hex::encode(hash),
        }
    }

    /// Known-item set for a gossip stream.
    pub fn known(&self, kind: ItemKind) -> &KnownItemSet {
        match kind {
            ItemKind::Transaction => &self.known_txs,
            ItemKind::Block => &self.known_blocks,
        }
    }

    /// Record that the peer has a transaction.
    pub fn mark_transaction(&self, hash: Hash) {
        self.known_txs.add(hash);
    }

    /// Record that the peer has a block.
    pub fn mark_block(&self, hash: Hash) {
        self.known_blocks.add(hash);
    }

    /// Whether the peer is known to have a transaction.
    pub fn knows_transaction(&self, hash: &Hash) -> bool {
        self.known_txs.contains(hash)
    }

    /// Whether the peer is known to have a block.
    pub fn knows_block(&self, hash: &Hash) -> bool {
        self.known_blocks.contains(hash)
    }

    /// Queue a message for the peer.
    pub fn send(&self, message: Message) -> P2pResult<()> {
        self.handle.send(message)
    }

    /// Ask the connection to close.
    pub fn disconnect(&self, reason: DisconnectReason) -> P2pResult<()> {
        self.handle.disconnect(reason)
    }

    /// Connection handle.
    pub fn handle(&self) -> &PeerHandle {
        &self.handle
    }
}

impl fmt::Debug for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerState")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("head", &*self.head.read())
            .finish()
    }
}
