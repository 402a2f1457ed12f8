//! Collaboration Rooms Module
//!
//! Everything that happens inside a room: the authoritative document, the
//! sessions attached to it and the throttled persistence of its snapshots.
//!
//! # Architecture
//!
//! - **`document`** - diamond-types text document with bounds-checked operations
//! - **`sessions`** - Session registry: auth state and outboxes per connection
//! - **`throttle`** - Persistence throttler: at most one snapshot write per window
//! - **`room`** - The room itself; serializes all mutations
//! - **`state`** - Room registry: room id to room, single-flight creation
//! - **`connection`** - WebSocket reader loop and writer task
//! - **`handlers`** - `GET /connect/{room_id}`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xfboard::backend::collab::{room::RoomSettings, state::RoomRegistry};
//! use xfboard::backend::storage::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RoomRegistry::new(Arc::new(MemoryStore::new()), RoomSettings::default());
//! let room = registry.get_or_create("r1").await?;
//! println!("{}", room.state().await.content);
//! # Ok(())
//! # }
//! ```

/// Room document
pub mod document;

/// Session registry
pub mod sessions;

/// Persistence throttler
pub mod throttle;

/// Rooms
pub mod room;

/// Room registry
pub mod state;

/// WebSocket connection driver
pub mod connection;

/// Connection handler
pub mod handlers;

/// Re-export commonly used types
pub use handlers::{connect_room, list_sessions};
pub use room::{Room, RoomError, RoomSettings};
pub use sessions::SessionInfo;
pub use state::RoomRegistry;
