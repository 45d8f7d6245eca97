//! Disconnect reason taxonomy.

use std::fmt;

/// Why a connection is being closed, as told to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// Local side asked to disconnect.
    Requested,
    /// Transport failure.
    NetworkError,
    /// Peer broke the message protocol after the handshake.
    ProtocolError,
    /// No room for another peer.
    TooManyPeers,
    /// A session with this identity already exists.
    AlreadyConnected,
    /// Node is shutting down.
    Shutdown,
    /// Status handshake failed, whatever the local sub-reason.
    HandshakeFailed,
    /// Code we do not know.
    Other(u64),
}

impl DisconnectReason {
    /// Numeric wire code.
    pub fn code(&self) -> u64 {
        match self {
            DisconnectReason::Requested => 0,
            DisconnectReason::NetworkError => 1,
            DisconnectReason::ProtocolError => 2,
            DisconnectReason::TooManyPeers => 4,
            DisconnectReason::AlreadyConnected => 5,
            DisconnectReason::Shutdown => 8,
            DisconnectReason::HandshakeFailed => 100,
            DisconnectReason::Other(code) => *code,
        }
    }

    /// Decode a wire code. Unknown codes are preserved.
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => DisconnectReason::Requested,
            1 => DisconnectReason::NetworkError,
            2 => DisconnectReason::ProtocolError,
            4 => DisconnectReason::TooManyPeers,
            5 => DisconnectReason::AlreadyConnected,
            8 => DisconnectReason::Shutdown,
            100 => DisconnectReason::HandshakeFailed,
            other => DisconnectReason::Other(other),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => write!(f, "requested"),
            DisconnectReason::NetworkError => write!(f, "network error"),
            DisconnectReason::ProtocolError => write!(f, "protocol error"),
            DisconnectReason::TooManyPeers => write!(f, "too many peers"),
            DisconnectReason::AlreadyConnected => write!(f, "already connected"),
            DisconnectReason::Shutdown => write!(f, "shutdown"),
            DisconnectReason::HandshakeFailed => write!(f, "handshake failed"),
            DisconnectReason::Other(code) => write!(f, "unknown ({})", code),
        }
    }
}
