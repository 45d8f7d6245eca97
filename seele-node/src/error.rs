//! Node error types.

use seele_p2p::{NodeId, P2pError};
use thiserror::Error;

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// Errors raised by the node outside the protocol layer.
#[derive(Debug, Error)]
pub enum NodeError {
    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol layer error.
    #[error("P2P error: {0}")]
    P2p(#[from] P2pError),

    /// The `--node-id` value is not a valid identity.
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    /// The `--coinbase` value is not a valid address.
    #[error("Invalid coinbase address: {0}")]
    InvalidCoinbase(String),

    /// TCP connect did not complete in time.
    #[error("Connection timeout to {addr}")]
    ConnectTimeout { addr: std::net::SocketAddr },

    /// The remote did not send its identity in time.
    #[error("Identity exchange timed out")]
    IdentityTimeout,

    /// We dialed or accepted ourselves.
    #[error("Connection to self ({0})")]
    SelfConnection(NodeId),
}
