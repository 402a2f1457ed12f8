//! Routes Module
//!
//! Route configuration for the backend server.
//!
//! - **`router`** - Main router creation, layers and fallback
//! - **`api_routes`** - Status, asset and unfurl routes

/// Main router configuration
pub mod router;

/// API route configuration
pub mod api_routes;

pub use router::create_router;
