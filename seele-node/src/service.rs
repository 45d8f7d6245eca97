//! Full node service.
//!
//! Binds the chain, the transaction pool and the protocol service together
//! and publishes the node's capabilities and APIs.

use std::sync::Arc;

use seele_p2p::{Capability, P2pResult, ProtocolService};

use crate::api::{ApiDescriptor, PublicSeeleApi};
use crate::chain::{Blockchain, ChainView, TransactionPool};
use crate::config::{Address, NodeConfig};

/// Namespace of the public API.
pub const API_NAMESPACE: &str = "seele";

/// Version of the public API.
pub const API_VERSION: &str = "1.0";

/// Seele full node service.
pub struct SeeleService {
    network_id: u64,
    coinbase: Address,
    tx_pool: Arc<dyn TransactionPool>,
    chain: Arc<dyn Blockchain>,
    protocol: Arc<ProtocolService>,
}

impl SeeleService {
    /// Create the service and its protocol layer.
    pub fn new(
        config: &NodeConfig,
        tx_pool: Arc<dyn TransactionPool>,
        chain: Arc<dyn Blockchain>,
    ) -> Self {
        let reader = Arc::new(ChainView(chain.clone()));
        let protocol = Arc::new(ProtocolService::new(config.p2p_config(), reader));
        Self {
            network_id: config.network_id,
            coinbase: config.coinbase,
            tx_pool,
            chain,
            protocol,
        }
    }

    /// Pending transaction pool.
    pub fn tx_pool(&self) -> &Arc<dyn TransactionPool> {
        &self.tx_pool
    }

    /// Local chain.
    pub fn block_chain(&self) -> &Arc<dyn Blockchain> {
        &self.chain
    }

    /// Network id this node joins.
    pub fn net_version(&self) -> u64 {
        self.network_id
    }

    /// Address mining rewards are paid to.
    pub fn coinbase(&self) -> &Address {
        &self.coinbase
    }

    /// The protocol service carrying peer sessions.
    pub fn protocol(&self) -> &Arc<ProtocolService> {
        &self.protocol
    }

    /// Network protocols this service runs.
    pub fn protocols(&self) -> Vec<Capability> {
        self.protocol.capabilities()
    }

    /// APIs this service publishes.
    pub fn apis(&self) -> Vec<ApiDescriptor> {
        vec![ApiDescriptor {
            namespace: API_NAMESPACE,
            version: API_VERSION,
            public: true,
            service: PublicSeeleApi::new(self.network_id, self.protocol.clone()),
        }]
    }

    /// Start the protocol service so connections can be handed to it.
    pub fn start(&self) -> P2pResult<()> {
        self.protocol.start()
    }

    /// Close every peer session. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.protocol.stop().await;
    }
}
