/**
 * Router Configuration
 *
 * Combines all routes into a single Axum router.
 *
 * # Routes
 *
 * 1. GET /connect/{room_id} - room WebSocket (authenticated)
 *    GET /rooms/{room_id}/sessions - connected sessions (authenticated)
 * 2. API routes (status, uploads, unfurl)
 * 3. Fallback: JSON 404
 *
 * # Layers
 *
 * Request bodies are capped at the configured upload limit, every request is
 * traced, and CORS is open to any origin since boards are usually served from
 * a different host than this server.
 */

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::backend::collab::handlers::{connect_room, list_sessions};
use crate::backend::error::BackendError;
use crate::backend::middleware::require_identity;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the application router
pub fn create_router(app_state: AppState) -> Router<()> {
    let auth = middleware::from_fn_with_state(app_state.clone(), require_identity);
    let router = Router::new()
        .route("/connect/{room_id}", get(connect_room).route_layer(auth.clone()))
        .route("/rooms/{room_id}/sessions", get(list_sessions).route_layer(auth));

    let router = configure_api_routes(router, &app_state);

    let router = router.fallback(|| async { BackendError::handler(StatusCode::NOT_FOUND, "not found") });

    router
        .layer(DefaultBodyLimit::max(app_state.assets.max_upload_bytes()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(app_state)
}
