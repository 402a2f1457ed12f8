/**
 * Authentication Gateway
 *
 * Combines credential extraction, the identity provider and the configured
 * auth mode into one decision per request (or per in-band auth message).
 */

use std::sync::Arc;

use axum::http::{HeaderMap, Uri};

use super::credentials;
use super::identity::{Identity, IdentityProvider, UserIdentity};
use super::AuthError;
use crate::backend::server::config::AuthMode;

/// Authentication gateway shared by all routes and connections
#[derive(Clone)]
pub struct AuthGateway {
    provider: Arc<dyn IdentityProvider>,
    mode: AuthMode,
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>, mode: AuthMode) -> Self {
        Self { provider, mode }
    }

    /// Whether requests without a credential are rejected
    pub fn is_enforced(&self) -> bool {
        self.mode == AuthMode::Enforced
    }

    /// Authenticate an HTTP request from its headers and query string
    pub async fn authenticate(&self, headers: &HeaderMap, uri: &Uri) -> Result<Identity, AuthError> {
        match credentials::extract(headers, uri) {
            Some(Ok(credential)) => {
                let user = self.provider.verify(&credential.token).await.map_err(|e| {
                    tracing::warn!("[Auth] Rejected credential from {}: {}", credential.source, e);
                    e
                })?;
                tracing::debug!("[Auth] Authenticated {} via {}", user.user_id, credential.source);
                Ok(Identity::User(user))
            }
            Some(Err(e)) => {
                tracing::warn!("[Auth] {}", e);
                Err(e)
            }
            None => match self.mode {
                AuthMode::Enforced => Err(AuthError::MissingCredential),
                AuthMode::Development => {
                    tracing::debug!("[Auth] No credential, admitting anonymous identity (development mode)");
                    Ok(Identity::Anonymous)
                }
            },
        }
    }

    /// Validate a token received in an in-band auth message
    pub async fn authenticate_token(&self, token: &str) -> Result<UserIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MalformedCredential {
                location: super::CredentialSource::InBand,
                message: "empty token".to_string(),
            });
        }
        self.provider.verify(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::auth::identity::StaticIdentityProvider;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn gateway(mode: AuthMode) -> AuthGateway {
        AuthGateway::new(Arc::new(StaticIdentityProvider::default().with_token("t1", "u1")), mode)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_valid_header_token() {
        let uri: Uri = "/connect/r1".parse().unwrap();
        let identity = gateway(AuthMode::Enforced).authenticate(&bearer("t1"), &uri).await.unwrap();
        assert_eq!(identity, Identity::User(UserIdentity::new("u1")));
    }

    #[tokio::test]
    async fn test_valid_query_token() {
        let uri: Uri = "/connect/r1?sessionId=s&auth=t1".parse().unwrap();
        let identity = gateway(AuthMode::Enforced).authenticate(&HeaderMap::new(), &uri).await.unwrap();
        assert_eq!(identity.label(), "u1");
    }

    #[tokio::test]
    async fn test_missing_credential_enforced() {
        let uri: Uri = "/connect/r1".parse().unwrap();
        let result = gateway(AuthMode::Enforced).authenticate(&HeaderMap::new(), &uri).await;
        assert_eq!(result, Err(AuthError::MissingCredential));
    }

    #[tokio::test]
    async fn test_missing_credential_development() {
        let uri: Uri = "/connect/r1".parse().unwrap();
        let result = gateway(AuthMode::Development).authenticate(&HeaderMap::new(), &uri).await;
        assert_eq!(result, Ok(Identity::Anonymous));
    }

    #[tokio::test]
    async fn test_invalid_token_rejected_in_every_mode() {
        let uri: Uri = "/connect/r1?auth=bad".parse().unwrap();
        for mode in [AuthMode::Enforced, AuthMode::Development] {
            let gateway = gateway(mode);
            assert!(gateway.authenticate(&bearer("bad"), &"/connect/r1".parse().unwrap()).await.is_err());
            assert!(gateway.authenticate(&HeaderMap::new(), &uri).await.is_err());
            assert!(gateway.authenticate_token("bad").await.is_err());
        }
    }

    #[tokio::test]
    async fn test_in_band_token() {
        let gateway = gateway(AuthMode::Enforced);
        assert_eq!(gateway.authenticate_token("t1").await.unwrap().user_id, "u1");
        assert!(matches!(
            gateway.authenticate_token("").await,
            Err(AuthError::MalformedCredential { .. })
        ));
    }
}
