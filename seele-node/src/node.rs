//! Node orchestrator.
//!
//! Coordinates the node components: chain, transaction pool, protocol
//! service, TCP transport and gossip relay.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use seele_p2p::{NodeId, PeerEvent};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;

use crate::chain::{Blockchain, MemoryChain, MemoryPool, TransactionPool};
use crate::config::NodeConfig;
use crate::error::NodeResult;
use crate::service::SeeleService;
use crate::shutdown::{shutdown_channel, wait_for_shutdown_signal, ShutdownGuard, ShutdownTx};
use crate::transport::Transport;

/// The main node structure.
pub struct Node {
    /// Node configuration.
    config: NodeConfig,

    /// Full node service.
    service: Arc<SeeleService>,

    /// TCP listener and dialer.
    transport: Arc<Transport>,

    /// Shutdown signal sender.
    shutdown_tx: ShutdownTx,

    /// Listener, relay and bootstrap dial tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    /// Create a node backed by an in-memory genesis chain and pool.
    pub fn new(config: NodeConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(MemoryPool::with_defaults()),
            Arc::new(MemoryChain::default()),
        )
    }

    /// Create a node over the given pool and chain.
    pub fn with_parts(
        config: NodeConfig,
        tx_pool: Arc<dyn TransactionPool>,
        chain: Arc<dyn Blockchain>,
    ) -> Self {
        let service = Arc::new(SeeleService::new(&config, tx_pool, chain));
        let transport = Arc::new(Transport::new(
            config.node_id,
            service.protocol().clone(),
            config.handshake_timeout,
        ));
        let (shutdown_tx, _) = shutdown_channel();

        Self {
            config,
            service,
            transport,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start listening, relaying and dialing bootstrap peers.
    ///
    /// Returns the bound listen address, which differs from the configured
    /// one when port 0 was requested.
    pub async fn start(&self) -> NodeResult<SocketAddr> {
        self.service.start()?;

        let listener = TcpListener::bind(self.config.listen).await?;
        let addr = listener.local_addr()?;

        let events = self.service.protocol().subscribe();
        let relay = tokio::spawn(relay_gossip(
            self.service.clone(),
            events,
            ShutdownGuard::new(&self.shutdown_tx),
        ));
        let accept = tokio::spawn(
            self.transport
                .clone()
                .accept_loop(listener, ShutdownGuard::new(&self.shutdown_tx)),
        );
        self.tasks.lock().extend([relay, accept]);

        tracing::info!(
            addr = %addr,
            network_id = self.config.network_id,
            node = ?self.config.node_id,
            "Node listening"
        );

        let dials: Vec<_> = self
            .config
            .bootstrap
            .iter()
            .map(|&peer| {
                let transport = self.transport.clone();
                let mut shutdown = ShutdownGuard::new(&self.shutdown_tx);
                tokio::spawn(async move {
                    tokio::select! {
                        _ = shutdown.wait() => {
                            tracing::debug!(addr = %peer, "Bootstrap dial cancelled");
                        }
                        result = transport.dial(peer) => match result {
                            Ok(remote) => tracing::debug!(addr = %peer, node = ?remote, "Dialed bootstrap peer"),
                            Err(e) => tracing::warn!(addr = %peer, error = %e, "Failed to dial bootstrap peer"),
                        },
                    }
                })
            })
            .collect();
        self.tasks.lock().extend(dials);

        Ok(addr)
    }

    /// Connect to a peer. Returns the remote identity once the stream is handed over.
    pub async fn connect(&self, addr: SocketAddr) -> NodeResult<NodeId> {
        self.transport.dial(addr).await
    }

    /// Stop every task and peer session. Safe to call more than once.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(());
        self.service.stop().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Run until SIGINT/SIGTERM.
    pub async fn run(&self) -> NodeResult<()> {
        self.start().await?;
        wait_for_shutdown_signal().await?;

        tracing::info!("Shutting down node...");
        self.stop().await;
        tracing::info!("Node shutdown complete");
        Ok(())
    }

    /// Get the node service.
    pub fn service(&self) -> &Arc<SeeleService> {
        &self.service
    }

    /// Get the node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}

/// Feed announced blocks and transactions into the local chain and pool, and
/// pass on the ones that were new to every peer that lacks them.
async fn relay_gossip(
    service: Arc<SeeleService>,
    mut events: Receiver<PeerEvent>,
    mut shutdown: ShutdownGuard,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.wait() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(PeerEvent::NewBlock {
                peer_id,
                hash,
                total_difficulty,
                payload,
            }) => {
                if service
                    .block_chain()
                    .import_announced(hash, total_difficulty.clone())
                {
                    match service
                        .protocol()
                        .broadcast_block(hash, total_difficulty, payload)
                    {
                        Ok(sent) => {
                            tracing::debug!(from = %peer_id, hash = %hex::encode(&hash[..8]), sent, "Relayed block")
                        }
                        Err(e) => {
                            tracing::debug!(from = %peer_id, hash = %hex::encode(&hash[..8]), error = %e, "Block not relayed")
                        }
                    }
                }
            }
            Ok(PeerEvent::NewTransaction {
                peer_id,
                hash,
                payload,
            }) => {
                if service.tx_pool().add_transaction(hash, payload.clone()) {
                    match service.protocol().broadcast_transaction(hash, payload) {
                        Ok(sent) => {
                            tracing::trace!(from = %peer_id, hash = %hex::encode(&hash[..8]), sent, "Relayed transaction")
                        }
                        Err(e) => {
                            tracing::debug!(from = %peer_id, hash = %hex::encode(&hash[..8]), error = %e, "Transaction not relayed")
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Gossip relay lagging behind peer events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
