/**
 * Room Registry
 *
 * Maps room ids to their `Room`. A room is created on first reference and
 * stays resident for the life of the process. Each id owns a slot holding a
 * `OnceCell` with the outcome of its load, so concurrent first references
 * share one snapshot load instead of racing to create competing rooms. The
 * slot of a failed load is removed; the slot of a loaded room never is.
 */

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use super::room::{Room, RoomError, RoomSettings};
use crate::backend::storage::{BlobStore, StorageError};
use crate::shared::SharedError;

/// Longest accepted room id, in chars
pub const MAX_ROOM_ID_LEN: usize = 256;

/// Outcome of a room's one load, shared by everyone who waited on it
type RoomSlot = Arc<OnceCell<Result<Arc<Room>, RoomError>>>;

/// All rooms of this process
pub struct RoomRegistry {
    store: Arc<dyn BlobStore>,
    settings: RoomSettings,
    rooms: RwLock<HashMap<String, RoomSlot>>,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn BlobStore>, settings: RoomSettings) -> Self {
        Self {
            store,
            settings,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> RoomSettings {
        self.settings
    }

    /// Resolve a room, loading it on first reference.
    ///
    /// Concurrent callers for the same id await the same load and share its
    /// outcome, failure included. A failed slot is then dropped from the map,
    /// so only a later reference loads again.
    pub async fn get_or_create(&self, room_id: &str) -> Result<Arc<Room>, RoomError> {
        let slot = self.slot(room_id).await;

        let outcome = slot
            .get_or_init(|| async {
                Room::load(room_id, self.store.clone(), self.settings)
                    .await
                    .map(Arc::new)
            })
            .await
            .clone();

        if let Err(e) = &outcome {
            let mut rooms = self.rooms.write().await;
            if rooms.get(room_id).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                rooms.remove(room_id);
                tracing::error!(room_id = %room_id, error = %e, "[Rooms] RoomInitialization failed");
            }
        }
        outcome
    }

    async fn slot(&self, room_id: &str) -> RoomSlot {
        if let Some(slot) = self.rooms.read().await.get(room_id) {
            return slot.clone();
        }
        self.rooms
            .write()
            .await
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// A loaded room, without creating it
    pub async fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).and_then(loaded_room)
    }

    pub async fn contains(&self, room_id: &str) -> bool {
        self.get(room_id).await.is_some()
    }

    /// Number of loaded rooms
    pub async fn len(&self) -> usize {
        self.loaded().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn loaded(&self) -> Vec<Arc<Room>> {
        self.rooms
            .read()
            .await
            .values()
            .filter_map(loaded_room)
            .collect()
    }

    /// Write every dirty room now. Returns the number of rooms written and the
    /// failures, which are also logged.
    pub async fn flush_all(&self) -> (usize, Vec<(String, StorageError)>) {
        let mut written = 0;
        let mut failures = Vec::new();

        for room in self.loaded().await {
            match room.flush().await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(room_id = %room.id(), error = %e, "[Rooms] Flush failed");
                    failures.push((room.id().to_string(), e));
                }
            }
        }

        tracing::info!(written, failed = failures.len(), "[Rooms] Flushed dirty rooms");
        (written, failures)
    }
}

fn loaded_room(slot: &RoomSlot) -> Option<Arc<Room>> {
    slot.get().and_then(|outcome| outcome.as_ref().ok()).cloned()
}

/// Check a room id taken from a request path
pub fn validate_room_id(room_id: &str) -> Result<(), SharedError> {
    if room_id.is_empty() {
        return Err(SharedError::invalid("roomId", "must not be empty"));
    }
    if room_id.chars().count() > MAX_ROOM_ID_LEN {
        return Err(SharedError::invalid(
            "roomId",
            format!("must be at most {} characters", MAX_ROOM_ID_LEN),
        ));
    }
    if room_id.chars().any(char::is_control) {
        return Err(SharedError::invalid("roomId", "must not contain control characters"));
    }
    Ok(())
}
