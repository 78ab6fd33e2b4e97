// ABOUTME: Message framing for the package transport.
// ABOUTME: Length-prefixed framing by default; short-read framing for legacy peers.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::TransportError;

/// Size of the big-endian length header in length-prefixed framing.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest message accepted by default (256 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Read buffer size used by short-read framing when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// How message boundaries are found on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Each message is preceded by its length as a big-endian `u32`.
    LengthPrefixed { max_message_size: usize },

    /// No header: reads are appended to the current message until one read
    /// returns fewer than `buffer_size` bytes.
    ///
    /// A message whose length is an exact multiple of `buffer_size` is never
    /// completed, since every read fills the buffer and the reader keeps
    /// waiting for more. Messages split by the network into short reads are
    /// delivered early, in pieces.
    ShortRead { buffer_size: usize },
}

impl Default for Framing {
    fn default() -> Self {
        Framing::length_prefixed()
    }
}

impl Framing {
    pub fn length_prefixed() -> Self {
        Framing::LengthPrefixed {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn short_read(buffer_size: usize) -> Self {
        Framing::ShortRead {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Read one complete message.
    ///
    /// Returns `Ok(None)` when the peer closes the connection before a message
    /// is complete.
    pub async fn read_message<R>(&self, reader: &mut R) -> Result<Option<Bytes>, TransportError>
    where
        R: AsyncRead + Unpin,
    {
        match *self {
            Framing::LengthPrefixed { max_message_size } => {
                read_length_prefixed(reader, max_message_size).await
            }
            Framing::ShortRead { buffer_size } => read_until_short(reader, buffer_size).await,
        }
    }

    /// Write one message and flush it.
    pub async fn write_message<W>(&self, writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if let Framing::LengthPrefixed { max_message_size } = *self {
            let max = max_message_size.min(u32::MAX as usize);
            if payload.len() > max {
                return Err(TransportError::MessageTooLarge {
                    size: payload.len(),
                    max,
                });
            }
            writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
        }

        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(())
    }
}

async fn read_length_prefixed<R>(
    reader: &mut R,
    max_message_size: usize,
) -> Result<Option<Bytes>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_SIZE {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TransportError::Truncated {
                expected: LENGTH_PREFIX_SIZE,
                received: filled,
            });
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_message_size {
        return Err(TransportError::MessageTooLarge {
            size: len,
            max: max_message_size,
        });
    }

    let mut body = BytesMut::zeroed(len);
    let mut received = 0;
    while received < len {
        let n = reader.read(&mut body[received..]).await?;
        if n == 0 {
            return Err(TransportError::Truncated {
                expected: len,
                received,
            });
        }
        received += n;
    }

    Ok(Some(body.freeze()))
}

async fn read_until_short<R>(
    reader: &mut R,
    buffer_size: usize,
) -> Result<Option<Bytes>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut message = BytesMut::new();
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            if !message.is_empty() {
                tracing::debug!(
                    pending = message.len(),
                    "peer closed before short read completed the message"
                );
            }
            return Ok(None);
        }

        message.extend_from_slice(&buffer[..n]);
        if n < buffer_size {
            return Ok(Some(message.freeze()));
        }
    }
}
