//! TCP transport.
//!
//! Right after the TCP connection is up, both sides write their 64-byte
//! node id and read the remote's. The stream is then handed to the
//! protocol service, which runs the status handshake on it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use seele_p2p::peer::NODE_ID_LEN;
use seele_p2p::{NodeId, ProtocolService};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::error::{NodeError, NodeResult};
use crate::shutdown::ShutdownGuard;

/// Listener and dialer feeding connections to the protocol service.
pub struct Transport {
    local_id: NodeId,
    protocol: Arc<ProtocolService>,
    /// Bound on TCP connect and on the identity exchange.
    timeout: Duration,
}

impl Transport {
    /// Create a transport announcing `local_id` and handing negotiated
    /// streams to `protocol`. `timeout` bounds both connect and id exchange.
    pub fn new(local_id: NodeId, protocol: Arc<ProtocolService>, timeout: Duration) -> Self {
        Self {
            local_id,
            protocol,
            timeout,
        }
    }

    /// Our node identity.
    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Dial a peer and hand the connection over. Returns the remote identity.
    pub async fn dial(&self, addr: SocketAddr) -> NodeResult<NodeId> {
        tracing::debug!(addr = %addr, "Connecting to peer");

        let mut stream = match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(NodeError::Io(e)),
            Err(_) => return Err(NodeError::ConnectTimeout { addr }),
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let remote = self.exchange_ids(&mut stream).await?;
        self.protocol.handle_connection(remote, stream)?;
        Ok(remote)
    }

    /// Accept connections until shutdown.
    pub async fn accept_loop(self: Arc<Self>, listener: TcpListener, mut shutdown: ShutdownGuard) {
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    tracing::debug!("Listener shutting down");
                    break;
                }

                result = listener.accept() => match result {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
                        }

                        let transport = self.clone();
                        tokio::spawn(async move {
                            if let Err(e) = transport.admit(stream).await {
                                tracing::debug!(addr = %addr, error = %e, "Inbound connection dropped");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }
    }

    async fn admit(&self, mut stream: TcpStream) -> NodeResult<NodeId> {
        let remote = self.exchange_ids(&mut stream).await?;
        self.protocol.handle_connection(remote, stream)?;
        Ok(remote)
    }

    /// Swap node ids with the remote. Fails on timeout and on self-connections.
    pub async fn exchange_ids<S>(&self, stream: &mut S) -> NodeResult<NodeId>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let exchange = async {
            stream.write_all(self.local_id.as_bytes()).await?;
            stream.flush().await?;
            let mut remote = [0u8; NODE_ID_LEN];
            stream.read_exact(&mut remote).await?;
            Ok::<_, std::io::Error>(NodeId::from_bytes(remote))
        };

        let remote = timeout(self.timeout, exchange)
            .await
            .map_err(|_| NodeError::IdentityTimeout)??;

        if remote == self.local_id {
            return Err(NodeError::SelfConnection(remote));
        }
        Ok(remote)
    }
}
