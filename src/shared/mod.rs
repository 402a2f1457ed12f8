//! Shared Module
//!
//! Types shared between the server and any Rust client of the room protocol.
//! Everything here is plain data: serializable, platform-agnostic and free of
//! server-only dependencies, so it compiles with or without the `ssr` feature.
//!
//! # Overview
//!
//! - **`crdt`** - Text operations and document state exchanged with clients
//! - **`protocol`** - In-band WebSocket messages (client ⇄ server)
//! - **`error`** - Errors that can occur on either side of the wire

/// CRDT types for collaborative editing
pub mod crdt;

/// WebSocket message protocol
pub mod protocol;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use crdt::{CRDTOperation, DocumentState};
pub use error::SharedError;
pub use protocol::{ClientMessage, ServerMessage};
