//! Node configuration.

use std::net::SocketAddr;
use std::time::Duration;

use rand::RngCore;
use seele_p2p::{NodeId, ProtocolConfig, DEFAULT_NETWORK_ID};

use crate::cli::Cli;
use crate::error::{NodeError, NodeResult};

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Account address.
pub type Address = [u8; ADDRESS_LEN];

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// P2P listen address.
    pub listen: SocketAddr,

    /// Peers dialed on startup.
    pub bootstrap: Vec<SocketAddr>,

    /// Network identifier.
    pub network_id: u64,

    /// Our node identity.
    pub node_id: NodeId,

    /// Account that mining rewards are sent to.
    pub coinbase: Address,

    /// Handshake timeout.
    pub handshake_timeout: Duration,

    /// Log level.
    pub log_level: String,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> NodeResult<Self> {
        let node_id = match &cli.node_id {
            Some(s) => NodeId::from_hex(s).map_err(|e| NodeError::InvalidNodeId(e.to_string()))?,
            None => random_node_id(),
        };

        let coinbase = match &cli.coinbase {
            Some(s) => parse_address(s)?,
            None => [0u8; ADDRESS_LEN],
        };

        Ok(Self {
            listen: cli.listen,
            bootstrap: cli.bootstrap.clone().unwrap_or_default(),
            network_id: cli.network_id,
            node_id,
            coinbase,
            handshake_timeout: Duration::from_secs(cli.handshake_timeout_secs),
            log_level: cli.log_level.clone(),
        })
    }

    /// Build the protocol configuration from node config.
    pub fn p2p_config(&self) -> ProtocolConfig {
        ProtocolConfig::new(self.network_id).with_handshake_timeout(self.handshake_timeout)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8057)),
            bootstrap: Vec::new(),
            network_id: DEFAULT_NETWORK_ID,
            node_id: random_node_id(),
            coinbase: [0u8; ADDRESS_LEN],
            handshake_timeout: seele_p2p::config::DEFAULT_HANDSHAKE_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

/// Generate a fresh random identity.
pub fn random_node_id() -> NodeId {
    let mut bytes = [0u8; seele_p2p::peer::NODE_ID_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    NodeId::from_bytes(bytes)
}

fn parse_address(s: &str) -> NodeResult<Address> {
    let mut address = [0u8; ADDRESS_LEN];
    hex::decode_to_slice(s.trim_start_matches("0x"), &mut address)
        .map_err(|e| NodeError::InvalidCoinbase(e.to_string()))?;
    Ok(address)
}
