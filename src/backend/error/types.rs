/**
 * Backend Error Types
 *
 * This module defines the errors handlers return. Every error maps to one
 * HTTP status code and a human-readable message.
 *
 * # Error Categories
 *
 * ## Handler Errors
 *
 * Invalid requests: a missing `sessionId`, a bad room id, an invalid asset key,
 * an oversized upload.
 *
 * ## Authorization Errors
 *
 * A missing credential in enforced mode, or a credential that is present but
 * malformed or invalid. Both are 401, never an anonymous fallback.
 *
 * ## Room Initialization Errors
 *
 * The room's snapshot could not be read or decoded. Reported as 503 so the
 * client knows to try again later; nothing was registered for the room.
 *
 * ## Storage Errors
 *
 * The blob store failed while serving an asset request.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::auth::AuthError;
use crate::backend::collab::room::RoomError;
use crate::backend::server::config::ConfigError;
use crate::backend::storage::StorageError;
use crate::shared::SharedError;

/// Backend-specific error types
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., missing query parameter, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Credential missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// A room could not be loaded
    #[error("Room unavailable: {0}")]
    RoomInitialization(#[from] RoomError),

    /// The server configuration is unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Blob store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// An upstream service (e.g. an unfurled page) failed
    #[error("Upstream error: {message}")]
    Upstream {
        /// Human-readable error message
        message: String,
    },

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    ///
    /// # Example
    ///
    /// ```rust
    /// use xfboard::backend::error::BackendError;
    /// use axum::http::StatusCode;
    ///
    /// let err = BackendError::handler(StatusCode::BAD_REQUEST, "sessionId is required");
    /// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    /// ```
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a 400 handler error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::BAD_REQUEST, message)
    }

    /// Create a new upstream error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `Unauthorized` - 401 Unauthorized
    /// - `RoomInitialization` - 503 Service Unavailable
    /// - `Config` - 500 Internal Server Error
    /// - `Storage` - 503 Service Unavailable
    /// - `Upstream` - 502 Bad Gateway
    /// - `SharedError` - 400 Bad Request
    /// - `SerializationError` - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RoomInitialization(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            // Shared errors describe client-supplied data
            Self::SharedError(_) => StatusCode::BAD_REQUEST,
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::Unauthorized(err) => err.to_string(),
            Self::RoomInitialization(err) => err.to_string(),
            Self::Config(err) => err.to_string(),
            // Store internals stay in the logs
            Self::Storage(_) => "storage unavailable".to_string(),
            Self::Upstream { message } => message.clone(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
