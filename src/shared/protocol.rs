//! Room WebSocket protocol
//!
//! Every frame is a JSON object with a `type` tag. Clients may send an `auth`
//! message at any point after connecting; the server answers `auth-ok` with the
//! resolved user id or `auth-denied`. Frames that do not parse as a
//! [`ClientMessage`] are ignored by the server.

use serde::{Deserialize, Serialize};

use crate::shared::crdt::CRDTOperation;

/// Messages a client sends to its room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// In-band credential for transports that cannot set headers or query parameters
    Auth { token: String },
    /// Text operations to apply, in order
    Ops { operations: Vec<CRDTOperation> },
    /// Liveness probe
    Ping,
}

/// Messages the server sends to a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// In-band credential accepted
    #[serde(rename_all = "camelCase")]
    AuthOk { user_id: String },
    /// In-band credential rejected
    AuthDenied { reason: String },
    /// Full document state, sent when a session may first observe the room
    Snapshot { content: String, version: usize },
    /// Operations applied on behalf of another session
    Update {
        origin: String,
        operations: Vec<CRDTOperation>,
        version: usize,
    },
    /// The sender's own operations were applied
    Ack { version: usize },
    /// The sender's operations were refused
    Denied { reason: String },
    /// Reply to [`ClientMessage::Ping`]
    Pong,
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, crate::shared::SharedError> {
        Ok(serde_json::from_str(text)?)
    }
}
