//! Registry of negotiated peers.
//!
//! Holds one [`PeerState`] per identity between a successful handshake and
//! disconnect, and is the only place where the per-peer known-item sets meet
//! the peer collection.

use std::collections::HashMap;
use std::sync::Arc;

use num_bigint::BigUint;
use parking_lot::RwLock;

use crate::error::{P2pError, P2pResult};
use crate::peer::{Hash, ItemKind, PeerId, PeerInfo, PeerState};
use crate::protocol::{check_frame_size, Message};

/// Tracks all registered peers.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<PeerId, Arc<PeerState>>>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a negotiated peer.
    ///
    /// Fails with [`P2pError::DuplicatePeer`] if the identity already has a
    /// session; the existing session is left untouched.
    pub fn register(&self, peer: Arc<PeerState>) -> P2pResult<()> {
        let mut peers = self.peers.write();
        let id = peer.id();
        if peers.contains_key(&id) {
            return Err(P2pError::DuplicatePeer(id));
        }
        peers.insert(id, peer);
        Ok(())
    }

    /// Remove a peer. Removing an unknown peer is a no-op.
    pub fn unregister(&self, id: &PeerId) -> Option<Arc<PeerState>> {
        self.peers.write().remove(id)
    }

    /// Remove a peer only if the registered session is `peer` itself.
    ///
    /// A connection that lost a duplicate race must not evict the session
    /// that won it.
    pub fn unregister_session(&self, peer: &Arc<PeerState>) -> bool {
        let mut peers = self.peers.write();
        match peers.get(&peer.id()) {
            Some(existing) if Arc::ptr_eq(existing, peer) => {
                peers.remove(&peer.id());
                true
            }
            _ => false,
        }
    }

    /// Get a peer by ID.
    pub fn get(&self, id: &PeerId) -> Option<Arc<PeerState>> {
        self.peers.read().get(id).cloned()
    }

    /// Check whether an identity is registered.
    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.read().contains_key(id)
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Check if no peer is registered.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// IDs of all registered peers.
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.read().keys().copied().collect()
    }

    /// All registered peers.
    pub fn peers(&self) -> Vec<Arc<PeerState>> {
        self.peers.read().values().cloned().collect()
    }

    /// Copies of every peer's info.
    pub fn snapshot(&self) -> Vec<PeerInfo> {
        self.peers.read().values().map(|p| p.info()).collect()
    }

    /// Peer with the highest total difficulty, with that difficulty.
    pub fn best_peer(&self) -> Option<(PeerId, BigUint)> {
        self.peers
            .read()
            .values()
            .map(|p| (p.id(), p.total_difficulty()))
            .max_by(|(_, a), (_, b)| a.cmp(b))
    }

    /// Send `payload` to every selected peer that does not know `id` yet.
    ///
    /// Each peer that gets the payload has `id` recorded in its known set
    /// for `kind`. Returns the number of peers the payload was queued for.
    /// A payload too large for one frame is rejected before any peer is touched.
    pub fn broadcast<F>(
        &self,
        kind: ItemKind,
        id: Hash,
        payload: &Message,
        selector: F,
    ) -> P2pResult<usize>
    where
        F: Fn(&PeerState) -> bool,
    {
        check_frame_size(payload)?;

        let targets: Vec<Arc<PeerState>> = self
            .peers
            .read()
            .values()
            .filter(|p| selector(p))
            .cloned()
            .collect();

        let mut sent = 0;
        for peer in targets {
            if !peer.known(kind).insert(id) {
                continue;
            }
            match peer.send(payload.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::debug!(peer = %peer.id(), error = %e, "Failed to broadcast to peer");
                }
            }
        }

        tracing::trace!(kind = %kind, hash = %hex::encode(&id[..8]), sent, "Broadcast");
        Ok(sent)
    }

    /// Drop every peer, returning them.
    pub fn clear(&self) -> Vec<Arc<PeerState>> {
        self.peers.write().drain().map(|(_, p)| p).collect()
    }
}
