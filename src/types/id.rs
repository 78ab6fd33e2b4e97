// ABOUTME: Numeric session identifiers for transport connections.
// ABOUTME: Ids are allocated as the current maximum plus one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one accepted transport connection.
///
/// Ids start at 1 and are handed out by the session registry as
/// `max(existing) + 1`, so an id can be reused once every higher id is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[must_use = "session ids reference live connections and should not be ignored"]
pub struct SessionId(u32);

impl SessionId {
    /// The id given to the first session of an empty registry.
    pub const FIRST: SessionId = SessionId(1);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
