//! Backend Module
//!
//! All server-side code for XFBoard: an Axum HTTP server whose main endpoint
//! upgrades to a WebSocket attached to a collaboration room.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - Router assembly and small API handlers
//! - **`collab`** - Room registry, rooms, sessions, document, persistence
//! - **`auth`** - Credential extraction, identity providers, auth gateway
//! - **`middleware`** - Request authentication middleware and extractor
//! - **`assets`** - Binary asset upload/download proxy
//! - **`storage`** - Blob stores (SQLite, in-memory)
//! - **`unfurl`** - Bookmark preview extraction
//! - **`error`** - Backend error types and HTTP conversion
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Config, state and initialization
//! ├── routes/         - Route configuration
//! ├── collab/         - Rooms and sessions
//! ├── auth/           - Authentication
//! ├── middleware/     - Request middleware
//! ├── assets/         - Asset gateway
//! ├── storage/        - Blob storage
//! ├── unfurl.rs       - Bookmark previews
//! └── error/          - Error types
//! ```
//!
//! # Request Flow
//!
//! 1. `GET /connect/{room_id}` passes the auth middleware (header or `auth`
//!    query parameter)
//! 2. The room registry resolves the room, loading its snapshot exactly once
//! 3. The socket is upgraded and the session admitted to the room
//! 4. Operations from the session are applied under the room's document lock
//!    and relayed to the other sessions
//! 5. The room's throttler writes a snapshot at most once per window

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Rooms, sessions and persistence
pub mod collab;

/// Authentication
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// Asset upload and download
pub mod assets;

/// Durable blob storage
pub mod storage;

/// Bookmark previews
pub mod unfurl;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use collab::state::RoomRegistry;
pub use error::BackendError;
pub use server::{create_app, AppState};
