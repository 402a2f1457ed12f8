//! Asset Gateway
//!
//! Proxies binary assets (images, videos, files dropped onto a board) to the
//! blob store under the `uploads/` namespace. Uploads require a credential;
//! downloads are public so an asset URL can be shared like any link.
//!
//! Asset keys are `{uuid}-{name}` with every character outside
//! `[A-Za-z0-9.]` replaced by `-`. A download key outside that alphabet is
//! rejected before the store is consulted. Long names are cut from the front
//! so every key fits in [`MAX_ASSET_KEY_LEN`].

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::backend::storage::{asset_key, BlobStore, StorageError, StoredObject};

/// HTTP handlers for upload and download
pub mod handlers;

pub use handlers::{download_asset, upload_asset};

/// Longest accepted asset key
pub const MAX_ASSET_KEY_LEN: usize = 512;

/// Response body of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    /// Where the asset can be fetched
    pub src: String,
    /// Storage key of the asset
    pub key: String,
}

/// Asset gateway over the shared blob store
#[derive(Clone)]
pub struct AssetGateway {
    store: Arc<dyn BlobStore>,
    max_upload_bytes: usize,
    public_base_url: Option<String>,
}

impl AssetGateway {
    pub fn new(store: Arc<dyn BlobStore>, max_upload_bytes: usize, public_base_url: Option<String>) -> Self {
        Self {
            store,
            max_upload_bytes,
            public_base_url: public_base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Store an upload under a fresh key derived from `name`
    pub async fn upload(
        &self,
        name: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> Result<UploadedAsset, StorageError> {
        let prefix = format!("{}-", Uuid::new_v4());
        let name = sanitize_asset_name(name);
        // Sanitized names are ASCII; keep the tail so the extension survives
        let room = MAX_ASSET_KEY_LEN - prefix.len();
        let key = format!("{}{}", prefix, &name[name.len().saturating_sub(room)..]);
        let size = body.len();

        self.store
            .put(&asset_key(&key), StoredObject::new(body, content_type))
            .await?;

        tracing::info!(key = %key, bytes = size, "[Assets] Stored upload");
        Ok(UploadedAsset {
            src: self.src_for(&key),
            key,
        })
    }

    /// Fetch an asset. `Ok(None)` when nothing is stored under `key`.
    pub async fn download(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        self.store.get(&asset_key(key)).await
    }

    fn src_for(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/uploads/{}", base, key),
            None => format!("/uploads/{}", key),
        }
    }
}

/// Replace every character outside `[A-Za-z0-9.]` with `-`
pub fn sanitize_asset_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '-' })
        .collect()
}

/// Whether `key` could have been produced by [`sanitize_asset_name`]
pub fn is_valid_asset_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_ASSET_KEY_LEN
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}
