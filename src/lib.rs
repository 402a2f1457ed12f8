//! XFBoard - Room Session Coordinator
//!
//! XFBoard hosts real-time collaborative documents. Each collaboration room
//! owns exactly one authoritative in-memory document (a diamond-types CRDT),
//! multiplexes many WebSocket sessions onto it, gates access by bearer
//! credential and persists snapshots to durable storage at a bounded rate.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and clients
//!   - CRDT operations and document state
//!   - The JSON WebSocket protocol
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP/WebSocket server and routing
//!   - Room registry, per-room sessions and throttled persistence
//!   - Authentication gateway and identity providers
//!   - Asset upload/download proxy and bookmark unfurling
//!   - Blob storage (SQLite or in-memory)
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - Enables the backend modules and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use xfboard::backend::server::{config::ServerConfig, init::{build_state, create_app}};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::load()?;
//! let state = build_state(config).await?;
//! let app = create_app(state);
//! // Serve `app` with axum::serve
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency Model
//!
//! - At most one room instance exists per room id within a process
//! - All mutations of a room are serialized through its document lock
//! - Snapshots are written in mutation order, at most once per window
//!
//! # Known Limitations
//!
//! Persistence is fire-and-forget: a client's edit is acknowledged before it is
//! durable, and a failed snapshot write is only logged. The room stays dirty
//! and is written again on its next edit or on graceful shutdown.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
