//! Backend Error Module
//!
//! Errors returned by HTTP handlers. Component errors (`AuthError`,
//! `RoomError`, `StorageError`, `SharedError`) convert into [`BackendError`],
//! which renders as a JSON error response.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse implementation
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use xfboard::backend::error::BackendError;
//! use axum::response::Response;
//!
//! # async fn example() -> Result<Response, BackendError> {
//! // Handler can return BackendError directly
//! # Ok(Response::new("OK".into()))
//! # }
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::BackendError;
