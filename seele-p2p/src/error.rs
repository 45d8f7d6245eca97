//! P2P error types.

use std::io;
use thiserror::Error;

use crate::peer::PeerId;
use crate::protocol::DisconnectReason;

/// Reasons a status handshake can fail.
///
/// Every variant is reported to the remote as
/// [`DisconnectReason::HandshakeFailed`]; the finer distinction is only
/// kept for local logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// No status message arrived within the handshake timeout.
    #[error("Handshake timeout")]
    Timeout,

    /// The connection became unusable before the status exchange finished.
    #[error("Handshake transport failure: {0}")]
    Transport(String),

    /// The peer belongs to another network.
    #[error("Network mismatch: ours {ours}, theirs {theirs}")]
    NetworkMismatch { ours: u64, theirs: u64 },

    /// The peer was started from a different genesis block.
    #[error("Genesis mismatch: expected {expected}, got {actual}")]
    GenesisMismatch { expected: String, actual: String },

    /// The peer speaks a protocol version outside our supported range.
    #[error("Unsupported protocol version {version} (supported: {min}..={max})")]
    VersionUnsupported { version: u32, min: u32, max: u32 },
}

impl HandshakeError {
    /// Disconnect reason sent to the remote for this failure.
    pub fn disconnect_reason(&self) -> DisconnectReason {
        DisconnectReason::HandshakeFailed
    }

    /// Whether the failure means the connection itself is unusable.
    pub fn is_timeout_class(&self) -> bool {
        matches!(self, HandshakeError::Timeout | HandshakeError::Transport(_))
    }
}

/// P2P-specific errors.
#[derive(Debug, Error)]
pub enum P2pError {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to serialize or deserialize a message.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Message exceeds maximum allowed size.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Invalid frame magic bytes.
    #[error("Invalid network magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// Status handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// A session with the same identity is already registered.
    #[error("Duplicate peer: {0}")]
    DuplicatePeer(PeerId),

    /// Peer not found.
    #[error("Peer not found: {0}")]
    PeerNotFound(PeerId),

    /// Channel send error.
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Service is shutting down.
    #[error("Service shutting down")]
    Shutdown,
}

/// Result type for P2P operations.
pub type P2pResult<T> = Result<T, P2pError>;
