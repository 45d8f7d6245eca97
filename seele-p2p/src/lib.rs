//! Peer sessions for the Seele protocol.
//!
//! This crate provides the network-layer bookkeeping of a Seele node:
//!
//! - Status handshake (network, genesis and version checks under a timeout)
//! - Per-peer head/difficulty state shared between tasks
//! - Bounded known-item sets used to suppress redundant gossip
//! - A registry of negotiated peers and the service that drives them
//!
//! # Architecture
//!
//! The transport hands each connected stream to the [`ProtocolService`],
//! which runs one tokio task per connection. Other components talk to a
//! session through its [`PeerState`] and never touch the socket.
//!
//! ```text
//! ProtocolService
//! ├── PeerRegistry ── PeerState (head, known txs, known blocks) ── PeerHandle
//! ├── Connection task 1 (handshake, then read/write loop)
//! └── Connection task 2 (handshake, then read/write loop)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use seele_p2p::{ProtocolConfig, ProtocolService};
//! use std::sync::Arc;
//!
//! let service = Arc::new(ProtocolService::new(ProtocolConfig::new(1), chain));
//! service.start()?;
//! service.handle_connection(remote_node_id, tcp_stream)?;
//! ```

pub mod config;
pub mod error;
pub mod serialization;

pub mod peer;
pub mod protocol;
pub mod registry;
pub mod service;

// Re-export main types
pub use config::{
    ProtocolConfig, DEFAULT_NETWORK_ID, MAX_MESSAGE_SIZE, MIN_PROTOCOL_VERSION, NETWORK_MAGIC,
    PROTOCOL_NAME, PROTOCOL_VERSION,
};
pub use error::{HandshakeError, P2pError, P2pResult};
pub use peer::{Hash, ItemKind, KnownItemSet, NodeId, PeerId, PeerInfo, PeerState};
pub use protocol::{DisconnectReason, Message, StatusMessage};
pub use registry::PeerRegistry;
pub use service::{Capability, ChainReader, PeerEvent, ProtocolService};
