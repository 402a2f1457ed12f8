/**
 * Identities and Identity Providers
 *
 * An `IdentityProvider` turns a bearer token into a user identity or a
 * definitive rejection. Two providers ship with the server:
 *
 * - `JwtIdentityProvider` - HS256 JWTs, the user id is the `sub` claim
 * - `StaticIdentityProvider` - a fixed token table for local development
 */

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// A validated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

/// Outcome of authenticating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A credential was validated
    User(UserIdentity),
    /// No credential, admitted because the server runs in development mode
    Anonymous,
}

impl Identity {
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    /// User id for logging
    pub fn label(&self) -> &str {
        match self {
            Self::User(user) => &user.user_id,
            Self::Anonymous => "anonymous",
        }
    }
}

/// Validates bearer tokens
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// HS256 JWT provider
pub struct JwtIdentityProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, issuer: Option<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
        }
    }

    /// Create a JWT token for a user
    pub fn issue_token(
        &self,
        user_id: &str,
        email: Option<String>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Issue(e.to_string()))?
            .as_secs();

        let claims = Claims {
            sub: user_id.to_string(),
            email,
            iss: self.issuer.clone(),
            exp: now + ttl.as_secs(),
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| AuthError::Issue(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("missing subject".to_string()));
        }
        Ok(UserIdentity {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Fixed token → user id table
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, String>,
}

impl StaticIdentityProvider {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        self.tokens
            .get(token)
            .map(UserIdentity::new)
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}
