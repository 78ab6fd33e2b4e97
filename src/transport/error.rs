// ABOUTME: Transport error types.
// ABOUTME: Covers socket I/O, framing violations, and unknown sessions.

use thiserror::Error;

use super::PackageError;
use crate::types::SessionId;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not resolve {address}:{port}")]
    Resolve { address: String, port: u16 },

    #[error("session {0} does not exist")]
    SessionNotFound(SessionId),

    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed after {received} of {expected} message bytes")]
    Truncated { expected: usize, received: usize },

    #[error("invalid package: {0}")]
    Package(#[from] PackageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
