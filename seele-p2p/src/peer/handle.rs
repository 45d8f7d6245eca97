//! Handle to a live connection's writer.

use tokio::sync::mpsc;

use crate::error::{P2pError, P2pResult};
use crate::peer::{NodeId, PeerId};
use crate::protocol::{DisconnectReason, Message};

/// Command sent from the rest of the node to a connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCommand {
    /// Write a message to the peer.
    Send(Message),
    /// Tell the peer why, then close the connection.
    Disconnect(DisconnectReason),
}

/// Send/close capability for one connection, plus the remote identity.
///
/// Commands go over an unbounded channel; `send` never blocks.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    node_id: NodeId,
    command_tx: mpsc::UnboundedSender<PeerCommand>,
}

impl PeerHandle {
    /// Create a handle and the receiver the connection task drains.
    pub fn channel(node_id: NodeId) -> (Self, mpsc::UnboundedReceiver<PeerCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        (Self { node_id, command_tx }, command_rx)
    }

    /// Remote node identity.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Remote peer id.
    pub fn peer_id(&self) -> PeerId {
        self.node_id.peer_id()
    }

    /// Queue a message for the peer.
    pub fn send(&self, message: Message) -> P2pResult<()> {
        self.command_tx
            .send(PeerCommand::Send(message))
            .map_err(|_| P2pError::ChannelSend("Peer command channel closed".to_string()))
    }

    /// Ask the connection task to disconnect with the given reason.
    pub fn disconnect(&self, reason: DisconnectReason) -> P2pResult<()> {
        self.command_tx
            .send(PeerCommand::Disconnect(reason))
            .map_err(|_| P2pError::ChannelSend("Peer command channel closed".to_string()))
    }

    /// Whether the connection task has gone away.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }
}
