/**
 * Persistence Throttler
 *
 * Coalesces a room's change notifications into at most one snapshot write per
 * window. The first notification after a quiet period opens a window; later
 * notifications only mark the room dirty. When the window elapses the current
 * document is serialized and written once.
 *
 * Writes go through `write_lock`, so the background task and an explicit
 * `flush` never overlap and snapshots reach the store in mutation order.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use super::document::TextDocument;
use crate::backend::storage::{BlobStore, StorageError, StoredObject};

const SNAPSHOT_CONTENT_TYPE: &str = "application/octet-stream";

struct ThrottleState {
    key: String,
    store: Arc<dyn BlobStore>,
    document: Arc<Mutex<TextDocument>>,
    dirty: AtomicBool,
    window_open: AtomicBool,
    wake: Notify,
    write_lock: Mutex<()>,
}

impl ThrottleState {
    /// Write the current document if it changed since the last write
    async fn write_if_dirty(&self) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;

        let snapshot = {
            let document = self.document.lock().await;
            if !self.dirty.swap(false, Ordering::SeqCst) {
                return Ok(false);
            }
            document.snapshot()
        };

        let size = snapshot.len();
        let object = StoredObject::new(Bytes::from(snapshot), Some(SNAPSHOT_CONTENT_TYPE.to_string()));
        match self.store.put(&self.key, object).await {
            Ok(()) => {
                tracing::debug!(key = %self.key, bytes = size, "[Persist] Snapshot written");
                Ok(true)
            }
            Err(e) => {
                // Stay dirty so the next window or a shutdown flush retries
                self.dirty.store(true, Ordering::SeqCst);
                tracing::error!(key = %self.key, error = %e, "[Persist] PersistenceWriteFailure");
                Err(e)
            }
        }
    }
}

/// Rate-limited snapshot writer for one room
pub struct PersistenceThrottler {
    state: Arc<ThrottleState>,
    task: JoinHandle<()>,
}

impl PersistenceThrottler {
    /// Start the background writer for `key`
    pub fn spawn(
        key: String,
        store: Arc<dyn BlobStore>,
        document: Arc<Mutex<TextDocument>>,
        window: Duration,
    ) -> Self {
        let state = Arc::new(ThrottleState {
            key,
            store,
            document,
            dirty: AtomicBool::new(false),
            window_open: AtomicBool::new(false),
            wake: Notify::new(),
            write_lock: Mutex::new(()),
        });

        let task = tokio::spawn(run(state.clone(), window));
        Self { state, task }
    }

    /// Record that the document changed
    pub fn notify_dirty(&self) {
        self.state.dirty.store(true, Ordering::SeqCst);
        if !self.state.window_open.swap(true, Ordering::SeqCst) {
            self.state.wake.notify_one();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty.load(Ordering::SeqCst)
    }

    /// Write now if there are unpersisted changes. Returns whether a write happened.
    pub async fn flush(&self) -> Result<bool, StorageError> {
        self.state.write_if_dirty().await
    }
}

impl Drop for PersistenceThrottler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(state: Arc<ThrottleState>, window: Duration) {
    loop {
        state.wake.notified().await;
        tokio::time::sleep(window).await;
        // Notifications from here on open the next window
        state.window_open.store(false, Ordering::SeqCst);
        // Failures are logged inside and retried later
        let _ = state.write_if_dirty().await;
    }
}
