// ABOUTME: Connecting side of the package transport.
// ABOUTME: Sends and receives framed messages over a single connection.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::{Framing, TransportError, UpdatePackage};

pub struct PackageClient {
    stream: TcpStream,
    framing: Framing,
    peer: SocketAddr,
}

impl PackageClient {
    pub async fn connect(address: &str, port: u16, framing: Framing) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((address, port)).await?;
        let peer = stream.peer_addr()?;
        tracing::debug!(%peer, "connected");
        Ok(Self {
            stream,
            framing,
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Write one message. With `close_after` the write side is shut down afterwards.
    pub async fn send(&mut self, payload: &[u8], close_after: bool) -> Result<(), TransportError> {
        self.framing.write_message(&mut self.stream, payload).await?;
        if close_after {
            self.stream.shutdown().await?;
        }
        Ok(())
    }

    /// Wait for the next complete message. `None` means the server closed the connection.
    pub async fn receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.framing.read_message(&mut self.stream).await
    }

    pub async fn disconnect(mut self) -> Result<(), TransportError> {
        self.stream.shutdown().await?;
        tracing::debug!(peer = %self.peer, "disconnected");
        Ok(())
    }
}

/// Connect, send one encoded package, and disconnect.
pub async fn push_package(
    address: &str,
    port: u16,
    framing: Framing,
    package: &UpdatePackage,
) -> Result<(), TransportError> {
    let encoded = package.encode();
    let mut client = PackageClient::connect(address, port, framing).await?;
    client.send(&encoded, false).await?;
    tracing::info!(peer = %client.peer_addr(), bytes = encoded.len(), "package pushed");
    client.disconnect().await
}
