//! Middleware Module
//!
//! HTTP middleware for the backend server.
//!
//! - **`auth`** - Authentication middleware and the [`AuthIdentity`] extractor
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use xfboard::backend::middleware::require_identity;
//! use xfboard::backend::server::AppState;
//!
//! fn protect(router: Router<AppState>, state: AppState) -> Router<AppState> {
//!     router.route_layer(middleware::from_fn_with_state(state, require_identity))
//! }
//! ```

pub mod auth;

pub use auth::{require_identity, AuthIdentity};
