//! Peer sessions.
//!
//! This module provides:
//! - Node and peer identifiers
//! - The connection handle a session forwards transport operations to
//! - Per-peer head/difficulty state and known-item sets
//! - Reporting snapshots

pub mod handle;
pub mod identity;
pub mod info;
pub mod known;
pub mod state;

// Re-export main types
pub use handle::{PeerCommand, PeerHandle};
pub use identity::{Hash, NodeId, PeerId, NODE_ID_LEN, PEER_ID_LEN};
pub use info::PeerInfo;
pub use known::{ItemKind, KnownItemSet};
pub use state::PeerState;
