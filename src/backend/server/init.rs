/**
 * Server Initialization
 *
 * Builds the application state from a `ServerConfig` and wires it into the
 * router.
 *
 * # Initialization Process
 *
 * 1. Validate the configuration
 * 2. Open the blob store (SQLite runs its migrations)
 * 3. Build the identity provider and auth gateway
 * 4. Create the room registry, asset gateway and unfurler
 * 5. Create and configure the router
 */

use std::sync::Arc;

use axum::Router;

use crate::backend::assets::AssetGateway;
use crate::backend::auth::{AuthGateway, IdentityProvider, JwtIdentityProvider, StaticIdentityProvider};
use crate::backend::collab::room::RoomSettings;
use crate::backend::collab::state::RoomRegistry;
use crate::backend::error::BackendError;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{ConfigError, IdentityProviderKind, ServerConfig, StorageBackend};
use crate::backend::server::state::AppState;
use crate::backend::storage::{BlobStore, MemoryStore, SqliteStore};
use crate::backend::unfurl::Unfurler;

/// Build application state from configuration
pub async fn build_state(config: ServerConfig) -> Result<AppState, BackendError> {
    config.validate()?;

    let store = open_store(&config).await?;
    let provider = identity_provider(&config)?;
    let gateway = AuthGateway::new(provider, config.auth.mode);

    let settings = RoomSettings {
        persist_interval: config.persist_interval(),
        unauthenticated_access: config.auth.unauthenticated_access,
    };
    let rooms = Arc::new(RoomRegistry::new(store.clone(), settings));
    let assets = AssetGateway::new(
        store,
        config.assets.max_upload_bytes,
        config.assets.public_base_url.clone(),
    );

    tracing::info!(
        auth_mode = ?config.auth.mode,
        provider = ?config.auth.provider,
        unauthenticated_access = ?config.auth.unauthenticated_access,
        storage = ?config.storage.backend,
        persist_interval_ms = config.rooms.persist_interval_ms,
        "Application state initialized"
    );

    Ok(AppState {
        rooms,
        gateway,
        assets,
        unfurler: Unfurler::new(),
        config: Arc::new(config),
    })
}

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    create_router(state)
}

async fn open_store(config: &ServerConfig) -> Result<Arc<dyn BlobStore>, BackendError> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            tracing::info!("Opening SQLite store at {}", config.storage.database_url);
            let store = SqliteStore::connect(&config.storage.database_url).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage: snapshots and uploads are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn identity_provider(config: &ServerConfig) -> Result<Arc<dyn IdentityProvider>, ConfigError> {
    match config.auth.provider {
        IdentityProviderKind::Jwt => {
            let secret = config
                .auth
                .jwt_secret
                .as_deref()
                .filter(|secret| !secret.is_empty())
                .ok_or(ConfigError::MissingValue("auth.jwt_secret (JWT_SECRET)"))?;
            Ok(Arc::new(JwtIdentityProvider::new(secret, config.auth.jwt_issuer.clone())))
        }
        IdentityProviderKind::Static => {
            if config.auth.static_tokens.is_empty() {
                tracing::warn!("[Auth] Static identity provider has no tokens configured");
            }
            Ok(Arc::new(StaticIdentityProvider::new(config.auth.static_tokens.clone())))
        }
    }
}
