//! Authentication Module
//!
//! Decides who is behind a request. Credentials are bearer tokens found in
//! one of three places, in order of precedence:
//!
//! 1. `Authorization: Bearer <token>` header
//! 2. `auth` query parameter (WebSocket clients in browsers cannot set headers)
//! 3. an in-band `{"type":"auth","token":...}` message after connecting
//!
//! # Architecture
//!
//! - **`credentials`** - Ordered extractors for the header and query locations
//! - **`identity`** - User identities and the identity providers that validate tokens
//! - **`gateway`** - `AuthGateway`, combining extraction, validation and the auth mode
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! ├── credentials.rs  - Credential extraction
//! ├── identity.rs     - Identities, JWT and static providers
//! └── gateway.rs      - Authentication decisions
//! ```
//!
//! # Security
//!
//! - A present but invalid credential is always rejected, never downgraded to anonymous
//! - A missing credential is rejected unless the server runs in `development` mode
//! - Validation happens once per credential; failures are not cached or retried

use thiserror::Error;

/// Credential extraction from requests
pub mod credentials;

/// Identities and identity providers
pub mod identity;

/// Authentication gateway
pub mod gateway;

pub use credentials::{Credential, CredentialSource};
pub use gateway::AuthGateway;
pub use identity::{Identity, IdentityProvider, JwtIdentityProvider, StaticIdentityProvider, UserIdentity};

/// Authentication failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential in any accepted location
    #[error("no credential provided")]
    MissingCredential,

    /// A credential was present but not a usable bearer token
    #[error("malformed credential in {location}: {message}")]
    MalformedCredential {
        location: CredentialSource,
        message: String,
    },

    /// The identity provider rejected the token
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// A token could not be issued
    #[error("failed to issue token: {0}")]
    Issue(String),
}
