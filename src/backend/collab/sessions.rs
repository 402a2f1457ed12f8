/**
 * Session Registry
 *
 * Tracks the live connections of one room. Each entry holds the session's
 * authentication state and its outbox, the sending half of the channel the
 * connection's writer task drains into the socket.
 *
 * A client chooses its own session id. When a reconnect reuses an id the new
 * connection replaces the old one; every admission gets a fresh connection id
 * so the replaced connection's cleanup cannot remove its successor.
 */

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::auth::Identity;
use crate::backend::server::config::UnauthenticatedAccess;
use crate::shared::ServerMessage;

/// Frames queued for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(ServerMessage),
    /// Close the socket after everything queued before it
    Close,
}

/// Sending half of a connection's outgoing queue
pub type Outbox = mpsc::UnboundedSender<Outbound>;

/// Authentication state of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum AuthState {
    Unauthenticated,
    #[serde(rename_all = "camelCase")]
    Authenticated {
        user_id: String,
        authenticated_at: DateTime<Utc>,
    },
}

impl AuthState {
    fn from_identity(identity: &Identity) -> Self {
        match identity.user() {
            Some(user) => Self::Authenticated {
                user_id: user.user_id.clone(),
                authenticated_at: Utc::now(),
            },
            None => Self::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Authenticated { user_id, .. } => Some(user_id),
            Self::Unauthenticated => None,
        }
    }

    pub fn can_observe(&self, policy: UnauthenticatedAccess) -> bool {
        self.is_authenticated() || policy.allows_observe()
    }

    pub fn can_edit(&self, policy: UnauthenticatedAccess) -> bool {
        self.is_authenticated() || policy.allows_edit()
    }
}

/// Handle held by a connection for the session it was admitted as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub connection_id: Uuid,
}

/// Presence information for one session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(flatten)]
    pub auth: AuthState,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SessionEntry {
    connection_id: Uuid,
    auth: AuthState,
    connected_at: DateTime<Utc>,
    /// Whether the session has been sent a snapshot
    observing: bool,
    outbox: Outbox,
}

impl SessionEntry {
    fn send(&self, message: ServerMessage) {
        // A closed outbox means the connection is already going away
        let _ = self.outbox.send(Outbound::Message(message));
    }
}

/// Result of an authentication upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upgrade {
    /// The session was upgraded and may now observe for the first time
    FirstObservation,
    /// The session was upgraded (or re-authenticated)
    Upgraded,
    /// No such session (it was removed or replaced)
    Gone,
}

/// Active sessions of one room
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a connection, replacing any older connection with the same id.
    ///
    /// The replaced connection is told to close.
    pub fn admit(&mut self, session_id: &str, identity: &Identity, outbox: Outbox) -> Session {
        let connection_id = Uuid::new_v4();
        let entry = SessionEntry {
            connection_id,
            auth: AuthState::from_identity(identity),
            connected_at: Utc::now(),
            observing: false,
            outbox,
        };

        if let Some(previous) = self.sessions.insert(session_id.to_string(), entry) {
            tracing::info!(
                session_id = %session_id,
                replaced = %previous.connection_id,
                "[Sessions] Session id reused, replacing older connection"
            );
            let _ = previous.outbox.send(Outbound::Close);
        }

        Session {
            session_id: session_id.to_string(),
            connection_id,
        }
    }

    /// Remove a session by id. Removing an unknown id is a no-op.
    pub fn remove(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Remove the session only if it still belongs to this connection
    pub fn release(&mut self, session: &Session) -> bool {
        match self.sessions.get(&session.session_id) {
            Some(entry) if entry.connection_id == session.connection_id => {
                self.sessions.remove(&session.session_id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, session: &Session) -> bool {
        self.entry(session).is_some()
    }

    pub fn auth_state(&self, session: &Session) -> Option<AuthState> {
        self.entry(session).map(|entry| entry.auth.clone())
    }

    /// Mark a session authenticated. An authenticated session stays authenticated.
    pub fn authenticate(&mut self, session: &Session, user_id: &str, policy: UnauthenticatedAccess) -> Upgrade {
        let Some(entry) = self.entry_mut(session) else {
            return Upgrade::Gone;
        };
        entry.auth = AuthState::Authenticated {
            user_id: user_id.to_string(),
            authenticated_at: Utc::now(),
        };
        if !entry.observing && entry.auth.can_observe(policy) {
            Upgrade::FirstObservation
        } else {
            Upgrade::Upgraded
        }
    }

    /// Queue a message for one session
    pub fn send(&self, session: &Session, message: ServerMessage) -> bool {
        match self.entry(session) {
            Some(entry) => {
                entry.send(message);
                true
            }
            None => false,
        }
    }

    /// Queue a close for one session
    pub fn close(&self, session: &Session) {
        if let Some(entry) = self.entry(session) {
            let _ = entry.outbox.send(Outbound::Close);
        }
    }

    /// Send the document snapshot to a session and mark it observing
    pub fn send_snapshot(&mut self, session: &Session, content: &str, version: usize) -> bool {
        match self.entry_mut(session) {
            Some(entry) => {
                entry.observing = true;
                entry.send(ServerMessage::Snapshot {
                    content: content.to_string(),
                    version,
                });
                true
            }
            None => false,
        }
    }

    /// Send a message to every observing session except `origin`.
    /// Returns the number of recipients.
    pub fn broadcast(&self, origin: &Session, message: &ServerMessage) -> usize {
        let mut recipients = 0;
        for (id, entry) in &self.sessions {
            if *id == origin.session_id || !entry.observing {
                continue;
            }
            entry.send(message.clone());
            recipients += 1;
        }
        recipients
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn presence(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|(id, entry)| SessionInfo {
                session_id: id.clone(),
                auth: entry.auth.clone(),
                connected_at: entry.connected_at,
            })
            .collect()
    }

    fn entry(&self, session: &Session) -> Option<&SessionEntry> {
        self.sessions
            .get(&session.session_id)
            .filter(|entry| entry.connection_id == session.connection_id)
    }

    fn entry_mut(&mut self, session: &Session) -> Option<&mut SessionEntry> {
        self.sessions
            .get_mut(&session.session_id)
            .filter(|entry| entry.connection_id == session.connection_id)
    }
}
