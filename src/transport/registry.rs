// ABOUTME: Session registry shared between the accept loop and senders.
// ABOUTME: Allocates session ids and holds each session's write half.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::types::SessionId;

/// Write half of a session's socket.
pub type SessionWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct SessionEntry {
    peer: SocketAddr,
    connected_at: DateTime<Utc>,
    writer: Arc<tokio::sync::Mutex<SessionWriter>>,
    cancel: CancellationToken,
}

/// Snapshot of one live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub connected_at: DateTime<Utc>,
}

/// Live sessions keyed by id.
///
/// A new session gets the current highest id plus one, or 1 when the registry
/// is empty. Ids of closed sessions can therefore be handed out again once
/// every higher id has gone.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<BTreeMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its id.
    pub fn insert(
        &self,
        peer: SocketAddr,
        writer: SessionWriter,
        cancel: CancellationToken,
    ) -> SessionId {
        let mut sessions = self.sessions.lock();
        let id = sessions
            .keys()
            .next_back()
            .map(|max| max.next())
            .unwrap_or(SessionId::FIRST);
        sessions.insert(
            id,
            SessionEntry {
                peer,
                connected_at: Utc::now(),
                writer: Arc::new(tokio::sync::Mutex::new(writer)),
                cancel,
            },
        );
        id
    }

    /// Remove a session and cancel its reader. Returns false if it was already gone.
    pub fn remove(&self, id: SessionId) -> bool {
        let entry = self.sessions.lock().remove(&id);
        match entry {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn writer(&self, id: SessionId) -> Option<Arc<tokio::sync::Mutex<SessionWriter>>> {
        self.sessions.lock().get(&id).map(|e| Arc::clone(&e.writer))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.lock().keys().copied().collect()
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .lock()
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: *id,
                peer: entry.peer,
                connected_at: entry.connected_at,
            })
            .collect()
    }

    /// Drop every session. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.sessions.lock());
        for entry in drained.values() {
            entry.cancel.cancel();
        }
        drained.len()
    }
}
