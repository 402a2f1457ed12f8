/**
 * Room
 *
 * A room is the unit of concurrency: it owns one document, one session
 * registry and one persistence throttler. Every mutation takes the document
 * lock first, so operations from all connections are applied one at a time,
 * and broadcasts leave in the same order the operations were applied.
 *
 * Lock order is document, then sessions. Code that only touches sessions
 * (leaving, presence) takes the sessions lock alone.
 */

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use super::document::{DocumentError, TextDocument};
use super::sessions::{AuthState, Outbox, Session, SessionInfo, SessionRegistry, Upgrade};
use super::throttle::PersistenceThrottler;
use crate::backend::auth::Identity;
use crate::backend::server::config::UnauthenticatedAccess;
use crate::backend::storage::{snapshot_key, BlobStore, StorageError};
use crate::shared::{CRDTOperation, DocumentState, ServerMessage};

/// Per-room behaviour shared by all rooms of a registry
#[derive(Debug, Clone, Copy)]
pub struct RoomSettings {
    /// Persistence window
    pub persist_interval: Duration,
    /// What sessions without a validated credential may do
    pub unauthenticated_access: UnauthenticatedAccess,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            persist_interval: Duration::from_secs(10),
            unauthenticated_access: UnauthenticatedAccess::default(),
        }
    }
}

/// Room initialization failures
///
/// Cloneable so that every caller waiting on the same load sees the same outcome.
#[derive(Debug, Clone, Error)]
pub enum RoomError {
    #[error("failed to load room {room_id}: {source}")]
    LoadFailed {
        room_id: String,
        #[source]
        source: Arc<StorageError>,
    },
    #[error("stored snapshot of room {room_id} is unreadable: {source}")]
    CorruptSnapshot {
        room_id: String,
        #[source]
        source: DocumentError,
    },
}

/// What happened to a batch of operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The document changed; the sender was acked and the others updated
    Applied { version: usize },
    /// Nothing to change; the sender was acked
    Unchanged { version: usize },
    /// The batch was refused; the sender was told why
    Denied { reason: String },
    /// The session is no longer part of the room
    Gone,
}

/// A collaboration room
pub struct Room {
    id: String,
    document: Arc<Mutex<TextDocument>>,
    sessions: RwLock<SessionRegistry>,
    throttler: PersistenceThrottler,
    settings: RoomSettings,
}

impl Room {
    /// Load a room from its stored snapshot, or start empty when there is none
    pub async fn load(id: &str, store: Arc<dyn BlobStore>, settings: RoomSettings) -> Result<Self, RoomError> {
        let key = snapshot_key(id);

        let document = match store.get(&key).await {
            Ok(Some(object)) => {
                let document = TextDocument::from_snapshot(&object.body).map_err(|source| {
                    RoomError::CorruptSnapshot {
                        room_id: id.to_string(),
                        source,
                    }
                })?;
                tracing::info!(room_id = %id, version = document.version(), "[Room] Restored from snapshot");
                document
            }
            Ok(None) => {
                tracing::info!(room_id = %id, "[Room] No snapshot, starting empty");
                TextDocument::new()
            }
            Err(source) => {
                return Err(RoomError::LoadFailed {
                    room_id: id.to_string(),
                    source: Arc::new(source),
                })
            }
        };

        let document = Arc::new(Mutex::new(document));
        let throttler = PersistenceThrottler::spawn(key, store, document.clone(), settings.persist_interval);

        Ok(Self {
            id: id.to_string(),
            document,
            sessions: RwLock::new(SessionRegistry::new()),
            throttler,
            settings,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> RoomSettings {
        self.settings
    }

    /// Admit a connection. Sessions allowed to observe get the snapshot at once.
    pub async fn join(&self, session_id: &str, identity: &Identity, outbox: Outbox) -> Session {
        let document = self.document.lock().await;
        let mut sessions = self.sessions.write().await;

        let session = sessions.admit(session_id, identity, outbox);
        let can_observe = sessions
            .auth_state(&session)
            .is_some_and(|auth| auth.can_observe(self.settings.unauthenticated_access));
        if can_observe {
            sessions.send_snapshot(&session, &document.content(), document.version());
        }

        tracing::info!(
            room_id = %self.id,
            session_id = %session_id,
            identity = %identity.label(),
            sessions = sessions.len(),
            "[Room] Session joined"
        );
        session
    }

    /// Upgrade a session after a valid in-band credential.
    ///
    /// Returns false if the session has already left.
    pub async fn authenticate_session(&self, session: &Session, user_id: &str) -> bool {
        let document = self.document.lock().await;
        let mut sessions = self.sessions.write().await;

        match sessions.authenticate(session, user_id, self.settings.unauthenticated_access) {
            Upgrade::Gone => false,
            upgrade => {
                sessions.send(
                    session,
                    ServerMessage::AuthOk {
                        user_id: user_id.to_string(),
                    },
                );
                if upgrade == Upgrade::FirstObservation {
                    sessions.send_snapshot(session, &document.content(), document.version());
                }
                tracing::info!(
                    room_id = %self.id,
                    session_id = %session.session_id,
                    user_id = %user_id,
                    "[Room] Session authenticated in-band"
                );
                true
            }
        }
    }

    /// Answer a rejected in-band credential.
    ///
    /// An unauthenticated session is closed and removed; an authenticated one
    /// keeps its state. Returns whether the session was removed.
    pub async fn reject_credential(&self, session: &Session, reason: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(auth) = sessions.auth_state(session) else {
            return false;
        };

        sessions.send(
            session,
            ServerMessage::AuthDenied {
                reason: reason.to_string(),
            },
        );
        if auth.is_authenticated() {
            return false;
        }

        sessions.close(session);
        sessions.release(session);
        tracing::info!(
            room_id = %self.id,
            session_id = %session.session_id,
            "[Room] Unauthenticated session closed after invalid credential"
        );
        true
    }

    /// Apply a batch of operations from a session
    pub async fn apply(&self, session: &Session, operations: &[CRDTOperation]) -> ApplyOutcome {
        let mut document = self.document.lock().await;
        let sessions = self.sessions.read().await;

        let Some(auth) = sessions.auth_state(session) else {
            return ApplyOutcome::Gone;
        };
        if !auth.can_edit(self.settings.unauthenticated_access) {
            let reason = "authentication required to edit".to_string();
            sessions.send(session, ServerMessage::Denied { reason: reason.clone() });
            return ApplyOutcome::Denied { reason };
        }

        match document.apply(&session.session_id, operations) {
            Ok(true) => {
                let version = document.version();
                self.throttler.notify_dirty();

                let update = ServerMessage::Update {
                    origin: session.session_id.clone(),
                    operations: operations.to_vec(),
                    version,
                };
                let recipients = sessions.broadcast(session, &update);
                sessions.send(session, ServerMessage::Ack { version });

                tracing::debug!(
                    room_id = %self.id,
                    session_id = %session.session_id,
                    ops = operations.len(),
                    version,
                    recipients,
                    "[Room] Operations applied"
                );
                ApplyOutcome::Applied { version }
            }
            Ok(false) => {
                let version = document.version();
                sessions.send(session, ServerMessage::Ack { version });
                ApplyOutcome::Unchanged { version }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::debug!(room_id = %self.id, session_id = %session.session_id, "[Room] Operations refused: {}", reason);
                sessions.send(session, ServerMessage::Denied { reason: reason.clone() });
                ApplyOutcome::Denied { reason }
            }
        }
    }

    /// Remove the session of a closing connection.
    ///
    /// A connection that was replaced by a reconnect does not remove its successor.
    pub async fn leave(&self, session: &Session) -> bool {
        let removed = self.sessions.write().await.release(session);
        if removed {
            tracing::info!(room_id = %self.id, session_id = %session.session_id, "[Room] Session left");
        }
        removed
    }

    /// Remove a session by id; a no-op for unknown ids
    pub async fn remove_session(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id)
    }

    pub async fn auth_state(&self, session: &Session) -> Option<AuthState> {
        self.sessions.read().await.auth_state(session)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Who is connected, for the sessions listing
    pub async fn presence(&self) -> Vec<SessionInfo> {
        self.sessions.read().await.presence()
    }

    /// Current document state
    pub async fn state(&self) -> DocumentState {
        self.document.lock().await.state()
    }

    pub fn is_dirty(&self) -> bool {
        self.throttler.is_dirty()
    }

    /// Write pending changes now
    pub async fn flush(&self) -> Result<bool, StorageError> {
        self.throttler.flush().await
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .finish()
    }
}
