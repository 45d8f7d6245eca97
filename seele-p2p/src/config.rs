//! Protocol configuration.

use std::time::Duration;

/// Frame magic bytes identifying the Seele protocol.
pub const NETWORK_MAGIC: [u8; 4] = [0x53, 0x45, 0x45, 0x4C]; // "SEEL"

/// Maximum frame body size in bytes (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Name under which the protocol is advertised as a capability.
pub const PROTOCOL_NAME: &str = "seele";

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 2;

/// Oldest protocol version we still negotiate with.
pub const MIN_PROTOCOL_VERSION: u32 = 1;

/// Default network identifier (mainnet).
pub const DEFAULT_NETWORK_ID: u64 = 1;

/// Default handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of transaction hashes remembered per peer.
pub const DEFAULT_MAX_KNOWN_TXS: usize = 32_768;

/// Default number of block hashes remembered per peer.
pub const DEFAULT_MAX_KNOWN_BLOCKS: usize = 1_024;

/// Configuration for the protocol service.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Network we belong to. Peers on other networks are rejected.
    pub network_id: u64,

    /// Version we announce; also the newest version we accept.
    pub protocol_version: u32,

    /// Oldest version we accept from a peer.
    pub min_protocol_version: u32,

    /// Timeout waiting for the remote status message.
    pub handshake_timeout: Duration,

    /// Capacity of each peer's known-transaction set.
    pub max_known_txs: usize,

    /// Capacity of each peer's known-block set.
    pub max_known_blocks: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            network_id: DEFAULT_NETWORK_ID,
            protocol_version: PROTOCOL_VERSION,
            min_protocol_version: MIN_PROTOCOL_VERSION,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_known_txs: DEFAULT_MAX_KNOWN_TXS,
            max_known_blocks: DEFAULT_MAX_KNOWN_BLOCKS,
        }
    }
}

impl ProtocolConfig {
    /// Create a configuration for the given network.
    pub fn new(network_id: u64) -> Self {
        Self {
            network_id,
            ..Default::default()
        }
    }

    /// Set the announced protocol version.
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    /// Set the oldest accepted protocol version.
    pub fn with_min_protocol_version(mut self, version: u32) -> Self {
        self.min_protocol_version = version;
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the capacity of the per-peer known-item sets.
    pub fn with_known_capacity(mut self, txs: usize, blocks: usize) -> Self {
        self.max_known_txs = txs;
        self.max_known_blocks = blocks;
        self
    }

    /// Check whether a remote protocol version falls in the supported range.
    pub fn supports_version(&self, version: u32) -> bool {
        (self.min_protocol_version..=self.protocol_version).contains(&version)
    }
}
