//! Blob Storage Module
//!
//! Durable key/value storage for opaque byte objects. Rooms and assets share
//! one store, separated by key namespace:
//!
//! - `rooms/{urlencoded room id}` - latest document snapshot of a room
//! - `uploads/{asset key}` - uploaded binary assets
//!
//! Each room writes only its own key, so no cross-room locking is needed.
//!
//! # Backends
//!
//! - **`sqlite`** - `SqliteStore`, durable, the default
//! - **`memory`** - `MemoryStore`, ephemeral, with counters and failure
//!   injection used by the test suite

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// In-memory store
pub mod memory;

/// SQLite-backed store
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A stored object and the content type it was written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn new(body: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            body: body.into(),
            content_type,
        }
    }
}

/// Storage failures
///
/// "Not found" is not an error: `get` returns `Ok(None)` for a missing key.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable blob store shared by all rooms and the asset gateway
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an object; `Ok(None)` when the key has never been written
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Write (or overwrite) an object
    async fn put(&self, key: &str, object: StoredObject) -> Result<(), StorageError>;

    /// Whether an object exists under `key`
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Storage key of a room's snapshot
///
/// The room id is percent-encoded so that every id maps to exactly one key and
/// no id can escape the `rooms/` namespace.
pub fn snapshot_key(room_id: &str) -> String {
    format!("rooms/{}", urlencoding::encode(room_id))
}

/// Storage key of an uploaded asset
pub fn asset_key(asset: &str) -> String {
    format!("uploads/{}", asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_key_layout() {
        assert_eq!(snapshot_key("r1"), "rooms/r1");
        assert_eq!(snapshot_key("a/../b"), "rooms/a%2F..%2Fb");
        assert_ne!(snapshot_key("a b"), snapshot_key("a+b"));
    }

    #[test]
    fn test_asset_key_layout() {
        assert_eq!(asset_key("abc-image.png"), "uploads/abc-image.png");
    }
}
