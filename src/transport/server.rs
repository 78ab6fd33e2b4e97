// ABOUTME: Listening side of the package transport.
// ABOUTME: Accepts sessions, reads framed messages, and reports them as events.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Framing, SessionRegistry, TransportError};
use crate::types::SessionId;

/// Pending connections the OS queues before accept.
pub const LISTEN_BACKLOG: u32 = 5;

/// What happened on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected { id: SessionId, peer: SocketAddr },
    Received { id: SessionId, payload: Bytes },
    Submitted { id: SessionId, closed: bool },
    Disconnected { id: SessionId },
}

/// Accepts connections and runs one task per session.
///
/// Clones share the registry, event queue, and accept token. Cancelling the
/// token stops accepting; open sessions keep running until they end or
/// [`PackageServer::shutdown`] drops them.
#[derive(Clone)]
pub struct PackageServer {
    registry: Arc<SessionRegistry>,
    framing: Framing,
    events: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
}

impl PackageServer {
    pub fn new(
        registry: Arc<SessionRegistry>,
        framing: Framing,
        events: mpsc::Sender<TransportEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            framing,
            events,
            cancel,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Bind a listening socket with the transport's backlog.
    pub async fn bind(address: &str, port: u16) -> Result<TcpListener, TransportError> {
        let addr = tokio::net::lookup_host((address, port))
            .await?
            .next()
            .ok_or_else(|| TransportError::Resolve {
                address: address.to_string(),
                port,
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(LISTEN_BACKLOG)?)
    }

    /// Bind and serve until shut down.
    pub async fn listen(&self, address: &str, port: u16) -> Result<(), TransportError> {
        let listener = Self::bind(address, port).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until cancelled.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), TransportError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "listening for packages");
        }

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.accept(stream, peer),
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
            }
        }

        tracing::info!(open = self.registry.len(), "stopped accepting packages");
        Ok(())
    }

    fn accept(&self, stream: TcpStream, peer: SocketAddr) {
        let (reader, writer) = stream.into_split();
        let session_cancel = CancellationToken::new();
        let id = self
            .registry
            .insert(peer, Box::new(writer), session_cancel.clone());
        tracing::info!(session = %id, %peer, "session opened");

        let server = self.clone();
        tokio::spawn(async move { server.run_session(id, peer, reader, session_cancel).await });
    }

    async fn run_session(
        self,
        id: SessionId,
        peer: SocketAddr,
        mut reader: OwnedReadHalf,
        cancel: CancellationToken,
    ) {
        let _ = self.events.send(TransportEvent::Connected { id, peer }).await;

        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => break,
                read = self.framing.read_message(&mut reader) => read,
            };

            match read {
                Ok(Some(payload)) => {
                    tracing::debug!(session = %id, bytes = payload.len(), "message received");
                    if self
                        .events
                        .send(TransportEvent::Received { id, payload })
                        .await
                        .is_err()
                    {
                        tracing::warn!(session = %id, "event queue closed, dropping session");
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!(session = %id, "peer closed connection");
                    break;
                }
                Err(e) => {
                    tracing::error!(session = %id, error = %e, "receive failed");
                    break;
                }
            }
        }

        self.registry.remove(id);
        tracing::info!(session = %id, "session closed");
        let _ = self.events.send(TransportEvent::Disconnected { id }).await;
    }

    /// Write one framed message to a session.
    ///
    /// With `close_after` the socket is shut down once the write completes and
    /// the session is removed. A failed write drops the session.
    pub async fn send(
        &self,
        id: SessionId,
        payload: &[u8],
        close_after: bool,
    ) -> Result<(), TransportError> {
        let writer = self
            .registry
            .writer(id)
            .ok_or(TransportError::SessionNotFound(id))?;

        let written = {
            let mut writer = writer.lock().await;
            let written = self.framing.write_message(&mut *writer, payload).await;
            if written.is_ok() && close_after {
                if let Err(e) = writer.shutdown().await {
                    tracing::debug!(session = %id, error = %e, "shutdown after send failed");
                }
            }
            written
        };

        match written {
            Ok(()) => {
                tracing::debug!(session = %id, bytes = payload.len(), close_after, "message sent");
                if close_after {
                    self.close(id);
                }
                let _ = self
                    .events
                    .send(TransportEvent::Submitted {
                        id,
                        closed: close_after,
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(session = %id, error = %e, "send failed");
                self.close(id);
                Err(e)
            }
        }
    }

    /// Drop one session. Returns false if it was not registered.
    pub fn close(&self, id: SessionId) -> bool {
        self.registry.remove(id)
    }

    /// Stop accepting and drop every session.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let closed = self.registry.close_all();
        if closed > 0 {
            tracing::info!(sessions = closed, "closed open sessions");
        }
    }
}
