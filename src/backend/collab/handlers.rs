/**
 * Room Connection Handler
 *
 * GET /connect/{room_id}?sessionId=..&auth=..
 *
 * The auth middleware has already resolved the caller's identity. The handler
 * checks the request before any room state is touched, resolves the room
 * (loading its snapshot on first reference) and upgrades to a WebSocket.
 *
 * GET /rooms/{room_id}/sessions lists who is connected to a loaded room.
 */

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
    Json,
};
use serde::Deserialize;

use super::connection;
use super::sessions::SessionInfo;
use super::state::validate_room_id;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthIdentity;
use crate::backend::server::state::AppState;

/// Query parameters of the connect endpoint
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Connect to a room (GET /connect/{room_id})
pub async fn connect_room(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(room_id): Path<String>,
    Query(params): Query<ConnectParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, BackendError> {
    let session_id = params
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BackendError::bad_request("sessionId is required"))?;
    validate_room_id(&room_id)?;

    let ws = ws.map_err(|rejection| BackendError::handler(rejection.status(), rejection.body_text()))?;

    let room = state.rooms.get_or_create(&room_id).await?;
    tracing::info!(
        room_id = %room_id,
        session_id = %session_id,
        identity = %identity.label(),
        "[Connect] Upgrading connection"
    );

    let gateway = state.gateway.clone();
    Ok(ws.on_upgrade(move |socket| connection::serve(socket, room, session_id, identity, gateway)))
}

/// Sessions connected to a room (GET /rooms/{room_id}/sessions)
///
/// Listing never loads a room; one that is not loaded has no sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthIdentity(identity): AuthIdentity,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<SessionInfo>>, BackendError> {
    validate_room_id(&room_id)?;

    let sessions = match state.rooms.get(&room_id).await {
        Some(room) => room.presence().await,
        None => Vec::new(),
    };
    tracing::debug!(
        room_id = %room_id,
        identity = %identity.label(),
        count = sessions.len(),
        "[Sessions] Listed"
    );
    Ok(Json(sessions))
}
