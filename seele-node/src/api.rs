//! Public API exposed under the `seele` namespace.

use std::sync::Arc;

use seele_p2p::{PeerInfo, ProtocolService};

/// Read-only node queries.
#[derive(Clone)]
pub struct PublicSeeleApi {
    network_id: u64,
    protocol: Arc<ProtocolService>,
}

impl PublicSeeleApi {
    /// Create the API over `protocol` for network `network_id`.
    pub fn new(network_id: u64, protocol: Arc<ProtocolService>) -> Self {
        Self {
            network_id,
            protocol,
        }
    }

    /// Network identifier this node runs on.
    pub fn net_version(&self) -> u64 {
        self.network_id
    }

    /// Snapshot of every connected peer.
    pub fn peer_infos(&self) -> Vec<PeerInfo> {
        self.protocol.peer_infos()
    }

    /// Connected peers rendered as JSON.
    pub fn peer_infos_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.peer_infos())
    }

    /// Number of connected peers.
    pub fn peer_count(&self) -> usize {
        self.protocol.peer_count()
    }
}

impl std::fmt::Debug for PublicSeeleApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicSeeleApi")
            .field("network_id", &self.network_id)
            .field("peers", &self.peer_count())
            .finish()
    }
}

/// An API a service publishes.
#[derive(Debug, Clone)]
pub struct ApiDescriptor {
    /// Namespace methods are published under.
    pub namespace: &'static str,
    /// API version.
    pub version: &'static str,
    /// Whether the API is open to untrusted callers.
    pub public: bool,
    /// The implementation.
    pub service: PublicSeeleApi,
}
