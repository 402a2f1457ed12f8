//! Shared Error Types
//!
//! Errors about data crossing the wire, raised on either side of the room
//! protocol: a frame that is not a protocol message, or an identifier a room
//! cannot be addressed by.
//!
//! # Usage
//!
//! ```rust
//! use xfboard::shared::error::SharedError;
//!
//! let error = SharedError::invalid("roomId", "must not be empty");
//! assert_eq!(error.field(), Some("roomId"));
//! ```
use thiserror::Error;

/// Errors in client-supplied data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// A frame that does not decode as a protocol message
    #[error("malformed message: {message}")]
    MalformedMessage { message: String },

    /// An identifier or parameter that fails validation
    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },
}

impl SharedError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The offending field, for validation failures
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidField { field, .. } => Some(field),
            Self::MalformedMessage { .. } => None,
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}
