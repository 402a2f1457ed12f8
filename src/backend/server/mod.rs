//! Server Module
//!
//! Configuration, application state and initialization of the Axum server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Configuration loading (TOML file + environment)
//! └── init.rs         - State construction and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::load()` reads `XFBOARD_CONFIG`
//!    and applies environment overrides
//! 2. **State Creation**: `build_state` opens storage, builds the auth gateway
//!    and the room registry
//! 3. **Router Creation**: `create_app` wires routes and layers

/// Application state
pub mod state;

/// Server configuration
pub mod config;

/// Server initialization
pub mod init;

pub use init::{build_state, create_app};
pub use state::AppState;
