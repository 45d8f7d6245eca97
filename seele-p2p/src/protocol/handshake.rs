//! Status handshake.
//!
//! The handshake protocol:
//! 1. Right after the transport connects, both sides send a `Status` message
//! 2. Each side waits, bounded by the handshake timeout, for the remote `Status`
//! 3. The remote status is checked in order: network id, genesis hash, version
//!
//! A failed handshake is reported to the remote as disconnect code 100
//! whatever the local reason was.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::config::ProtocolConfig;
use crate::error::HandshakeError;
use crate::protocol::{DisconnectReason, Message, MessageCodec, StatusMessage};

/// Check a remote status against our own.
///
/// Checks, first failure wins:
/// - Network id matches
/// - Genesis hash matches
/// - Protocol version is in the supported range
pub fn validate_status(
    remote: &StatusMessage,
    local: &StatusMessage,
    config: &ProtocolConfig,
) -> Result<(), HandshakeError> {
    if remote.network_id != local.network_id {
        return Err(HandshakeError::NetworkMismatch {
            ours: local.network_id,
            theirs: remote.network_id,
        });
    }

    if remote.genesis_hash != local.genesis_hash {
        return Err(HandshakeError::GenesisMismatch {
            expected: hex::encode(local.genesis_hash),
            actual: hex::encode(remote.genesis_hash),
        });
    }

    if !config.supports_version(remote.protocol_version) {
        return Err(HandshakeError::VersionUnsupported {
            version: remote.protocol_version,
            min: config.min_protocol_version,
            max: config.protocol_version,
        });
    }

    Ok(())
}

/// Handshake state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Transport connected, nothing sent yet.
    #[default]
    Connected,
    /// Our status is sent, waiting for the remote one.
    AwaitingRemoteStatus,
    /// Remote status accepted.
    Negotiated(StatusMessage),
    /// Handshake failed; the connection is to be closed.
    Disconnected(HandshakeError),
}

impl HandshakeState {
    /// Create initial handshake state.
    pub fn new() -> Self {
        Self::Connected
    }

    /// Record that our status went out.
    pub fn sent_status(&mut self) {
        if matches!(self, Self::Connected) {
            *self = Self::AwaitingRemoteStatus;
        }
    }

    /// Process the remote status.
    pub fn received_status(
        &mut self,
        remote: StatusMessage,
        local: &StatusMessage,
        config: &ProtocolConfig,
    ) -> Result<(), HandshakeError> {
        if !matches!(self, Self::AwaitingRemoteStatus) {
            let err = HandshakeError::Transport("status received out of order".to_string());
            *self = Self::Disconnected(err.clone());
            return Err(err);
        }

        match validate_status(&remote, local, config) {
            Ok(()) => {
                *self = Self::Negotiated(remote);
                Ok(())
            }
            Err(err) => {
                *self = Self::Disconnected(err.clone());
                Err(err)
            }
        }
    }

    /// Move to the failed state. A negotiated handshake stays negotiated.
    pub fn fail(&mut self, err: HandshakeError) {
        if !self.is_negotiated() {
            *self = Self::Disconnected(err);
        }
    }

    /// Check if the handshake succeeded.
    pub fn is_negotiated(&self) -> bool {
        matches!(self, Self::Negotiated(_))
    }

    /// Get the accepted remote status, if negotiated.
    pub fn remote_status(&self) -> Option<&StatusMessage> {
        match self {
            Self::Negotiated(status) => Some(status),
            _ => None,
        }
    }

    /// Disconnect reason to report, if the handshake failed.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        match self {
            Self::Disconnected(err) => Some(err.disconnect_reason()),
            _ => None,
        }
    }
}

/// Run the handshake over a framed stream.
///
/// Returns the remote status on success. On failure a `Disconnect` frame
/// with code 100 is sent best-effort; closing the stream is left to the
/// caller dropping it.
pub async fn perform_handshake<S>(
    framed: &mut Framed<S, MessageCodec>,
    local: &StatusMessage,
    config: &ProtocolConfig,
) -> Result<StatusMessage, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut state = HandshakeState::new();

    let exchanged = timeout(config.handshake_timeout, exchange_status(framed, &mut state, local))
        .await
        .unwrap_or(Err(HandshakeError::Timeout));

    let outcome = exchanged.and_then(|remote| {
        state.received_status(remote, local, config)?;
        Ok(())
    });

    match outcome {
        Ok(()) => match state {
            HandshakeState::Negotiated(remote) => Ok(remote),
            _ => Err(HandshakeError::Transport("handshake incomplete".to_string())),
        },
        Err(err) => {
            state.fail(err.clone());
            let code = err.disconnect_reason().code();
            let _ = timeout(config.handshake_timeout, framed.send(Message::Disconnect(code))).await;
            Err(err)
        }
    }
}

/// Send our status and read the first remote message.
async fn exchange_status<S>(
    framed: &mut Framed<S, MessageCodec>,
    state: &mut HandshakeState,
    local: &StatusMessage,
) -> Result<StatusMessage, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    framed
        .send(Message::Status(local.clone()))
        .await
        .map_err(|e| HandshakeError::Transport(e.to_string()))?;
    state.sent_status();

    match framed.next().await {
        Some(Ok(Message::Status(remote))) => Ok(remote),
        Some(Ok(Message::Disconnect(code))) => Err(HandshakeError::Transport(format!(
            "remote disconnected: {}",
            DisconnectReason::from_code(code)
        ))),
        Some(Ok(other)) => Err(HandshakeError::Transport(format!(
            "unexpected message: {}",
            other.name()
        ))),
        Some(Err(e)) => Err(HandshakeError::Transport(e.to_string())),
        None => Err(HandshakeError::Transport("connection closed".to_string())),
    }
}
