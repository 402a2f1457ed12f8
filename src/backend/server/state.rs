/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * `AppState` holds:
 * - The room registry (all rooms of the process)
 * - The auth gateway
 * - The asset gateway
 * - The bookmark unfurler
 * - The loaded configuration
 *
 * Everything is cheap to clone: shared parts sit behind `Arc`.
 *
 * # Example
 *
 * ```rust
 * use xfboard::backend::auth::AuthGateway;
 * use axum::extract::State;
 *
 * async fn handler(State(gateway): State<AuthGateway>) -> bool {
 *     gateway.is_enforced()
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::assets::AssetGateway;
use crate::backend::auth::AuthGateway;
use crate::backend::collab::state::RoomRegistry;
use crate::backend::server::config::ServerConfig;
use crate::backend::unfurl::Unfurler;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    pub gateway: AuthGateway,
    pub assets: AssetGateway,
    pub unfurler: Unfurler,
    pub config: Arc<ServerConfig>,
}

impl FromRef<AppState> for Arc<RoomRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.rooms.clone()
    }
}

impl FromRef<AppState> for AuthGateway {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl FromRef<AppState> for AssetGateway {
    fn from_ref(state: &AppState) -> Self {
        state.assets.clone()
    }
}

impl FromRef<AppState> for Unfurler {
    fn from_ref(state: &AppState) -> Self {
        state.unfurler.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
