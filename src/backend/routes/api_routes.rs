/**
 * API Route Configuration
 *
 * Routes outside the room connection itself:
 *
 * - GET /status - auth policy, so clients know whether to send a credential
 * - POST /uploads/{name} - asset upload (authenticated)
 * - GET /uploads/{key} - asset download (public)
 * - GET /unfurl?url= - bookmark preview (authenticated)
 */

use axum::{
    extract::State,
    handler::Handler,
    middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::backend::assets::{download_asset, upload_asset};
use crate::backend::middleware::require_identity;
use crate::backend::server::config::UnauthenticatedAccess;
use crate::backend::server::state::AppState;
use crate::backend::unfurl::unfurl_handler;

/// Response of GET /status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub auth_enforced: bool,
    pub unauthenticated_access: UnauthenticatedAccess,
}

/// Server auth policy (GET /status)
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        auth_enforced: state.gateway.is_enforced(),
        unauthenticated_access: state.config.auth.unauthenticated_access,
    })
}

/// Configure API routes
pub fn configure_api_routes(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state.clone(), require_identity);

    router
        .route("/status", get(status))
        .route(
            "/uploads/{key}",
            get(download_asset).post(upload_asset.layer(auth.clone())),
        )
        .route("/unfurl", get(unfurl_handler).route_layer(auth))
}
