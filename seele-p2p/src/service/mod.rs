//! Protocol service.
//!
//! Owns the peer registry and runs one task per connection: the status
//! handshake first, then the receive loop of the registered session.
//!
//! ```text
//! transport ──stream──▶ handle_connection()
//!                          └── connection task
//!                                ├── perform_handshake()
//!                                ├── registry.register()
//!                                └── session loop (frames ⇄ commands)
//! ```

mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigUint;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{ProtocolConfig, PROTOCOL_NAME};
use crate::error::{HandshakeError, P2pError, P2pResult};
use crate::peer::{Hash, ItemKind, NodeId, PeerId, PeerInfo, PeerState};
use crate::protocol::{
    DisconnectReason, Message, NewBlockMessage, NewTransactionMessage, StatusMessage,
};
use crate::registry::PeerRegistry;

/// How long `stop` waits for connection tasks to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Capacity of the peer event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Read access to the local chain, supplied by the node.
pub trait ChainReader: Send + Sync {
    /// Hash of the block at height 0.
    fn genesis_hash(&self) -> Hash;

    /// Current best block hash and its total difficulty.
    fn current_head(&self) -> (Hash, BigUint);
}

/// Named, versioned protocol the node advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    /// Protocol name.
    pub name: String,
    /// Protocol version.
    pub version: u32,
}

/// Something that happened to a peer session.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// Handshake succeeded and the peer is in the registry.
    Registered { peer_id: PeerId, info: PeerInfo },
    /// The session ended and the peer left the registry.
    Unregistered {
        peer_id: PeerId,
        reason: DisconnectReason,
    },
    /// The handshake failed; nothing was registered.
    HandshakeFailed {
        node_id: NodeId,
        error: HandshakeError,
    },
    /// A peer announced a block.
    NewBlock {
        peer_id: PeerId,
        hash: Hash,
        total_difficulty: BigUint,
        payload: Vec<u8>,
    },
    /// A peer announced a transaction.
    NewTransaction {
        peer_id: PeerId,
        hash: Hash,
        payload: Vec<u8>,
    },
}

/// Network-layer service for the Seele protocol.
pub struct ProtocolService {
    /// Protocol configuration.
    config: Arc<ProtocolConfig>,
    /// Local chain, for our status message.
    chain: Arc<dyn ChainReader>,
    /// Negotiated peers.
    registry: Arc<PeerRegistry>,
    /// Peer event fan-out.
    events: broadcast::Sender<PeerEvent>,
    /// Cancelled once by `stop`.
    shutdown: CancellationToken,
    /// Set by `start`, cleared by `stop`.
    running: AtomicBool,
    /// Connection tasks.
    tasks: Mutex<JoinSet<()>>,
}

impl ProtocolService {
    /// Create a new protocol service.
    pub fn new(config: ProtocolConfig, chain: Arc<dyn ChainReader>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            chain,
            registry: Arc::new(PeerRegistry::new()),
            events,
            shutdown: CancellationToken::new(),
            running: AtomicBool::new(false),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Start accepting connections.
    pub fn start(&self) -> P2pResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(P2pError::Shutdown);
        }
        if !self.running.swap(true, Ordering::SeqCst) {
            tracing::info!(
                network_id = self.config.network_id,
                version = self.config.protocol_version,
                "Protocol service started"
            );
        }
        Ok(())
    }

    /// Stop the service: close every connection and empty the registry.
    ///
    /// Safe to call more than once, and on a service that never started.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let was_running = self.running.swap(false, Ordering::SeqCst);

        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        if !tasks.is_empty() {
            tracing::info!(count = tasks.len(), "Shutting down peer connections");
            let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
                while tasks.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                tracing::warn!(remaining = tasks.len(), "Aborting peer connections");
                tasks.abort_all();
            }
        }

        self.registry.clear();

        if was_running {
            tracing::info!("Protocol service stopped");
        }
    }

    /// Whether `start` was called and `stop` was not.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Take over a freshly connected transport stream.
    ///
    /// `node_id` is the remote identity reported by the transport. The
    /// handshake and session run on their own task.
    pub fn handle_connection<S>(self: &Arc<Self>, node_id: NodeId, stream: S) -> P2pResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if !self.is_running() {
            return Err(P2pError::Shutdown);
        }

        let service = Arc::clone(self);
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(service.run_connection(node_id, stream));
        Ok(())
    }

    /// Our status message, built from the current chain head.
    pub fn local_status(&self) -> StatusMessage {
        let (head_hash, total_difficulty) = self.chain.current_head();
        StatusMessage {
            protocol_version: self.config.protocol_version,
            network_id: self.config.network_id,
            genesis_hash: self.chain.genesis_hash(),
            head_hash,
            total_difficulty,
        }
    }

    /// Subscribe to peer events.
    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.events.subscribe()
    }

    /// Capabilities this service speaks.
    pub fn capabilities(&self) -> Vec<Capability> {
        vec![Capability {
            name: PROTOCOL_NAME.to_string(),
            version: self.config.protocol_version,
        }]
    }

    /// Send `payload` to selected peers that do not know `id` yet.
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
        self.registry.broadcast(kind, id, payload, selector)
    }

    /// Announce a block to every peer that does not have it.
    pub fn broadcast_block(
        &self,
        hash: Hash,
        total_difficulty: BigUint,
        payload: Vec<u8>,
    ) -> P2pResult<usize> {
        let message = Message::NewBlock(NewBlockMessage {
            hash,
            total_difficulty,
            payload,
        });
        self.registry.broadcast(ItemKind::Block, hash, &message, |_| true)
    }

    /// Announce a transaction to every peer that does not have it.
    pub fn broadcast_transaction(&self, hash: Hash, payload: Vec<u8>) -> P2pResult<usize> {
        let message = Message::NewTransaction(NewTransactionMessage { hash, payload });
        self.registry.broadcast(ItemKind::Transaction, hash, &message, |_| true)
    }

    /// Disconnect a registered peer.
    pub fn disconnect_peer(&self, peer_id: &PeerId, reason: DisconnectReason) -> P2pResult<()> {
        let peer = self
            .registry
            .get(peer_id)
            .ok_or(P2pError::PeerNotFound(*peer_id))?;
        peer.disconnect(reason)
    }

    /// Snapshots of every registered peer.
    pub fn peer_infos(&self) -> Vec<PeerInfo> {
        self.registry.snapshot()
    }

    /// Number of registered peers.
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }

    /// The peer registry.
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    fn emit(&self, event: PeerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedChain;

    impl ChainReader for FixedChain {
        fn genesis_hash(&self) -> Hash {
            [0x11; 32]
        }

        fn current_head(&self) -> (Hash, BigUint) {
            ([0x22; 32], BigUint::from(42u32))
        }
    }

    fn service() -> Arc<ProtocolService> {
        Arc::new(ProtocolService::new(ProtocolConfig::new(9), Arc::new(FixedChain)))
    }

    #[test]
    fn test_local_status() {
        let status = service().local_status();
        assert_eq!(status.network_id, 9);
        assert_eq!(status.genesis_hash, [0x11; 32]);
        assert_eq!(status.head_hash, [0x22; 32]);
        assert_eq!(status.total_difficulty, BigUint::from(42u32));
    }

    #[test]
    fn test_capabilities() {
        let caps = service().capabilities();
        assert_eq!(
            caps,
            vec![Capability {
                name: "seele".to_string(),
                version: crate::config::PROTOCOL_VERSION,
            }]
        );
    }

    #[tokio::test]
    async fn test_stop_never_started() {
        let service = service();
        service.stop().await;
        service.stop().await;
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let service = service();
        service.start().unwrap();
        service.start().unwrap();
        assert!(service.is_running());

        service.stop().await;
        service.stop().await;
        assert!(!service.is_running());
        assert!(matches!(service.start(), Err(P2pError::Shutdown)));
    }

    #[tokio::test]
    async fn test_connection_rejected_when_not_running() {
        let service = service();
        let (stream, _other) = tokio::io::duplex(1024);

        let result = service.handle_connection(NodeId::from_bytes([1u8; 64]), stream);
        assert!(matches!(result, Err(P2pError::Shutdown)));
    }

    #[test]
    fn test_disconnect_unknown_peer() {
        let result = service().disconnect_peer(&PeerId([0u8; 8]), DisconnectReason::Requested);
        assert!(matches!(result, Err(P2pError::PeerNotFound(_))));
    }
}
