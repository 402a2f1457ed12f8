/**
 * Authentication Middleware
 *
 * Protects routes that need a caller identity. The middleware runs the auth
 * gateway on the request (Authorization header, then `auth` query parameter)
 * and either rejects with 401 or stores the resulting `Identity` in the
 * request extensions for handlers to pick up with [`AuthIdentity`].
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::backend::auth::{AuthGateway, Identity};
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Authentication middleware
///
/// Returns 401 Unauthorized if the credential is invalid, or missing while
/// auth is enforced. In development mode a request without any credential
/// continues as `Identity::Anonymous`.
pub async fn require_identity(
    State(gateway): State<AuthGateway>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let identity = gateway.authenticate(request.headers(), request.uri()).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Axum extractor for the identity set by [`require_identity`]
#[derive(Clone, Debug)]
pub struct AuthIdentity(pub Identity);

impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthIdentity)
            .ok_or_else(|| {
                tracing::warn!("[Auth] Identity not found in request extensions");
                BackendError::from(crate::backend::auth::AuthError::MissingCredential)
            })
    }
}
