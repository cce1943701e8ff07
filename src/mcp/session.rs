//! MCP session lifecycle.
//!
//! Sessions are created by `initialize`, identified by a random UUID carried
//! in the `Mcp-Session-Id` header, flagged as initialized by the client's
//! `notifications/initialized` acknowledgement, and removed by an explicit
//! `DELETE`, a re-`initialize`, or idle expiry.
//!
//! A session may call tools as soon as its `initialize` response has been
//! produced; the acknowledgement is recorded but not awaited.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `initialize` answered, acknowledgement not yet received.
    AwaitingAck,
    /// Client sent `notifications/initialized`.
    Initialized,
}

/// Client information received during initialisation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// A point-in-time copy of one session record.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session token.
    pub id: String,
    /// Protocol version agreed during `initialize`.
    pub protocol_version: String,
    /// Client name and version, if the client sent them.
    pub client_info: Option<ClientInfo>,
    /// Handshake state.
    pub state: SessionState,
    /// When `initialize` created the session.
    pub created_at: Instant,
    /// Last time a request referenced the session.
    pub last_seen: Instant,
}

impl Session {
    /// Whether the client has acknowledged initialisation.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state == SessionState::Initialized
    }
}

/// Thread-safe registry of live sessions.
///
/// Cloning is cheap; clones share the same session map.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionManager {
    /// Creates an empty session manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new session and returns its id.
    pub fn create(&self, protocol_version: &str, client_info: Option<ClientInfo>) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let session = Session {
            id: id.clone(),
            protocol_version: protocol_version.to_string(),
            client_info,
            state: SessionState::AwaitingAck,
            created_at: now,
            last_seen: now,
        };
        self.sessions.lock().insert(id.clone(), session);
        tracing::debug!(session_id = %id, protocol_version, "Session created");
        id
    }

    /// Marks a session as initialized.
    ///
    /// Returns `false` if the session does not exist.
    pub fn mark_initialized(&self, id: &str) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };
        session.state = SessionState::Initialized;
        session.last_seen = Instant::now();
        true
    }

    /// Returns whether the id names a live session.
    #[must_use]
    pub fn is_valid(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Returns a copy of the session record.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().get(id).cloned()
    }

    /// Records activity on a session.
    ///
    /// Returns `false` if the session does not exist.
    pub fn touch(&self, id: &str) -> bool {
        self.sessions.lock().get_mut(id).is_some_and(|session| {
            session.last_seen = Instant::now();
            true
        })
    }

    /// Removes a session.
    ///
    /// Returns `false` if the session did not exist.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.lock().remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Drops every session idle for longer than `max_idle`.
    ///
    /// Returns the number of sessions removed.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() <= max_idle);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::info!(pruned, "Expired idle sessions");
        }
        pruned
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether there are no live sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
