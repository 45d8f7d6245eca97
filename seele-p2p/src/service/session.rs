//! Per-connection task: handshake, registration, receive loop.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use super::{PeerEvent, ProtocolService};
use crate::error::P2pError;
use crate::peer::{NodeId, PeerCommand, PeerHandle, PeerState};
use crate::protocol::{perform_handshake, DisconnectReason, Message, MessageCodec};

/// What the receive loop does after handling one inbound message.
enum Flow {
    Continue,
    Reply(Message),
    Close(DisconnectReason),
}

impl ProtocolService {
    pub(super) async fn run_connection<S>(self: Arc<Self>, node_id: NodeId, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut framed = Framed::new(stream, MessageCodec::new());
        let local = self.local_status();

        let handshake = tokio::select! {
            _ = self.shutdown.cancelled() => return,
            result = perform_handshake(&mut framed, &local, &self.config) => result,
        };

        let remote = match handshake {
            Ok(remote) => remote,
            Err(error) => {
                if error.is_timeout_class() {
                    tracing::debug!(node = ?node_id, error = %error, "Handshake aborted");
                } else {
                    tracing::debug!(
                        node = ?node_id,
                        error = %error,
                        code = error.disconnect_reason().code(),
                        "Handshake rejected"
                    );
                }
                self.emit(PeerEvent::HandshakeFailed { node_id, error });
                return;
            }
        };

        let (handle, command_rx) = PeerHandle::channel(node_id);
        let peer = Arc::new(PeerState::from_status(handle, &remote, &self.config));
        peer.mark_block(remote.head_hash);

        if let Err(e) = self.registry.register(peer.clone()) {
            tracing::debug!(peer = %peer.id(), error = %e, "Dropping new connection");
            let code = DisconnectReason::AlreadyConnected.code();
            let _ = framed.send(Message::Disconnect(code)).await;
            return;
        }

        tracing::info!(
            peer = %peer.id(),
            version = peer.version(),
            td = %remote.total_difficulty,
            "Peer registered"
        );
        self.emit(PeerEvent::Registered {
            peer_id: peer.id(),
            info: peer.info(),
        });

        let reason = self.session_loop(&peer, &mut framed, command_rx).await;

        self.registry.unregister_session(&peer);
        tracing::info!(peer = %peer.id(), reason = %reason, "Peer unregistered");
        self.emit(PeerEvent::Unregistered {
            peer_id: peer.id(),
            reason,
        });
    }

    async fn session_loop<S>(
        &self,
        peer: &PeerState,
        framed: &mut Framed<S, MessageCodec>,
        mut commands: mpsc::UnboundedReceiver<PeerCommand>,
    ) -> DisconnectReason
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = framed.send(Message::Disconnect(DisconnectReason::Shutdown.code())).await;
                    return DisconnectReason::Shutdown;
                }

                command = commands.recv() => match command {
                    Some(PeerCommand::Send(message)) => {
                        tracing::trace!(peer = %peer.id(), msg = %message, "Sending message");
                        if let Err(reason) = send_or_drop(peer, framed, message).await {
                            return reason;
                        }
                    }
                    Some(PeerCommand::Disconnect(reason)) => {
                        let _ = framed.send(Message::Disconnect(reason.code())).await;
                        return reason;
                    }
                    None => return DisconnectReason::Requested,
                },

                incoming = framed.next() => match incoming {
                    Some(Ok(message)) => match self.handle_message(peer, message) {
                        Flow::Continue => {}
                        Flow::Reply(reply) => {
                            if let Err(reason) = send_or_drop(peer, framed, reply).await {
                                return reason;
                            }
                        }
                        Flow::Close(reason) => {
                            if reason == DisconnectReason::ProtocolError {
                                let _ = framed.send(Message::Disconnect(reason.code())).await;
                            }
                            return reason;
                        }
                    },
                    Some(Err(e)) => {
                        tracing::debug!(peer = %peer.id(), error = %e, "Bad frame");
                        let _ = framed
                            .send(Message::Disconnect(DisconnectReason::ProtocolError.code()))
                            .await;
                        return DisconnectReason::ProtocolError;
                    }
                    None => return DisconnectReason::NetworkError,
                },
            }
        }
    }

    fn handle_message(&self, peer: &PeerState, message: Message) -> Flow {
        tracing::trace!(peer = %peer.id(), msg = %message, "Received message");

        match message {
            Message::NewBlock(block) => {
                peer.mark_block(block.hash);
                peer.set_head(block.hash, block.total_difficulty.clone());
                self.emit(PeerEvent::NewBlock {
                    peer_id: peer.id(),
                    hash: block.hash,
                    total_difficulty: block.total_difficulty,
                    payload: block.payload,
                });
                Flow::Continue
            }
            Message::NewTransaction(tx) => {
                peer.mark_transaction(tx.hash);
                self.emit(PeerEvent::NewTransaction {
                    peer_id: peer.id(),
                    hash: tx.hash,
                    payload: tx.payload,
                });
                Flow::Continue
            }
            Message::Ping(nonce) => Flow::Reply(Message::Pong(nonce)),
            Message::Pong(_) => Flow::Continue,
            Message::Disconnect(code) => Flow::Close(DisconnectReason::from_code(code)),
            Message::Status(_) => {
                tracing::debug!(peer = %peer.id(), "Status after handshake");
                Flow::Close(DisconnectReason::ProtocolError)
            }
        }
    }
}

/// Write one message. Only a transport failure ends the session; a message
/// that cannot be encoded is dropped and nothing reaches the wire.
async fn send_or_drop<S>(
    peer: &PeerState,
    framed: &mut Framed<S, MessageCodec>,
    message: Message,
) -> Result<(), DisconnectReason>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.send(message).await {
        Ok(()) => Ok(()),
        Err(P2pError::Io(e)) => {
            tracing::debug!(peer = %peer.id(), error = %e, "Write failed");
            Err(DisconnectReason::NetworkError)
        }
        Err(e) => {
            tracing::debug!(peer = %peer.id(), error = %e, "Dropping unsendable message");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::peer::Hash;
    use crate::protocol::{NewBlockMessage, StatusMessage};
    use crate::service::ChainReader;
    use num_bigint::BigUint;
    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio::time::timeout;

    struct FixedChain;

    impl ChainReader for FixedChain {
        fn genesis_hash(&self) -> Hash {
            [0u8; 32]
        }

        fn current_head(&self) -> (Hash, BigUint) {
            ([0xA1; 32], BigUint::from(100u32))
        }
    }

    fn remote_status() -> StatusMessage {
        StatusMessage {
            protocol_version: 2,
            network_id: 1,
            genesis_hash: [0u8; 32],
            head_hash: [0xB2; 32],
            total_difficulty: BigUint::from(50u32),
        }
    }

    async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<PeerEvent>) -> PeerEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event timeout")
            .expect("event channel closed")
    }

    /// Service plus a raw framed stream playing the remote peer, past the handshake.
    async fn connected() -> (
        Arc<ProtocolService>,
        Framed<DuplexStream, MessageCodec>,
        tokio::sync::broadcast::Receiver<PeerEvent>,
    ) {
        let service = Arc::new(ProtocolService::new(ProtocolConfig::new(1), Arc::new(FixedChain)));
        service.start().unwrap();
        let mut events = service.subscribe();

        let (local, remote) = tokio::io::duplex(64 * 1024);
        service
            .handle_connection(NodeId::from_bytes([0x33; 64]), local)
            .unwrap();

        let mut remote = Framed::new(remote, MessageCodec::new());
        remote.send(Message::Status(remote_status())).await.unwrap();
        assert!(matches!(remote.next().await, Some(Ok(Message::Status(_)))));
        assert!(matches!(next_event(&mut events).await, PeerEvent::Registered { .. }));

        (service, remote, events)
    }

    #[tokio::test]
    async fn test_new_block_updates_head() {
        let (service, mut remote, mut events) = connected().await;

        remote
            .send(Message::NewBlock(NewBlockMessage {
                hash: [0xC3; 32],
                total_difficulty: BigUint::from(75u32),
                payload: vec![1, 2, 3],
            }))
            .await
            .unwrap();

        match next_event(&mut events).await {
            PeerEvent::NewBlock { hash, total_difficulty, payload, .. } => {
                assert_eq!(hash, [0xC3; 32]);
                assert_eq!(total_difficulty, BigUint::from(75u32));
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let peer = service.registry().get(&NodeId::from_bytes([0x33; 64]).peer_id()).unwrap();
        assert_eq!(peer.head(), ([0xC3; 32], BigUint::from(75u32)));
        assert!(peer.knows_block(&[0xC3; 32]));
    }

    #[tokio::test]
    async fn test_ping_answered() {
        let (_service, mut remote, _events) = connected().await;

        remote.send(Message::Ping(77)).await.unwrap();
        assert_eq!(remote.next().await.unwrap().unwrap(), Message::Pong(77));
    }

    #[tokio::test]
    async fn test_second_status_is_protocol_error() {
        let (service, mut remote, mut events) = connected().await;

        remote.send(Message::Status(remote_status())).await.unwrap();
        assert_eq!(
            remote.next().await.unwrap().unwrap(),
            Message::Disconnect(DisconnectReason::ProtocolError.code())
        );
        assert!(matches!(
            next_event(&mut events).await,
            PeerEvent::Unregistered { reason: DisconnectReason::ProtocolError, .. }
        ));
        assert_eq!(service.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_close_unregisters() {
        let (service, remote, mut events) = connected().await;
        drop(remote);

        assert!(matches!(
            next_event(&mut events).await,
            PeerEvent::Unregistered { reason: DisconnectReason::NetworkError, .. }
        ));
        assert_eq!(service.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_sends_shutdown() {
        let (service, mut remote, _events) = connected().await;

        service.stop().await;
        assert_eq!(
            remote.next().await.unwrap().unwrap(),
            Message::Disconnect(DisconnectReason::Shutdown.code())
        );
        assert_eq!(service.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_send_keeps_session() {
        let (service, mut remote, _events) = connected().await;
        let peer = service.registry().get(&NodeId::from_bytes([0x33; 64]).peer_id()).unwrap();

        peer.send(Message::NewBlock(NewBlockMessage {
            hash: [0xD4; 32],
            total_difficulty: BigUint::from(1u32),
            payload: vec![0u8; 2 * 1024 * 1024],
        }))
        .unwrap();

        remote.send(Message::Ping(5)).await.unwrap();
        assert_eq!(remote.next().await.unwrap().unwrap(), Message::Pong(5));
        assert_eq!(service.peer_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_command() {
        let (service, mut remote, _events) = connected().await;
        let peer_id = NodeId::from_bytes([0x33; 64]).peer_id();

        service.disconnect_peer(&peer_id, DisconnectReason::TooManyPeers).unwrap();
        assert_eq!(
            remote.next().await.unwrap().unwrap(),
            Message::Disconnect(DisconnectReason::TooManyPeers.code())
        );
    }
}
