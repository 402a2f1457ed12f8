/**
 * Server Configuration
 *
 * This module handles loading and validation of server configuration.
 *
 * # Configuration Sources
 *
 * Configuration is layered, later sources winning:
 * 1. Built-in defaults (enforced auth, SQLite at `xfboard.db`, 10 s window)
 * 2. An optional TOML file named by `XFBOARD_CONFIG`
 * 3. Environment variables (a `.env` file is honoured by the binary)
 *
 * # Environment Variables
 *
 * `SERVER_HOST`, `SERVER_PORT`, `AUTH_MODE`, `IDENTITY_PROVIDER`,
 * `JWT_SECRET`, `JWT_ISSUER`, `UNAUTHENTICATED_ACCESS`, `STORAGE_BACKEND`,
 * `DATABASE_URL`, `PERSIST_INTERVAL_MS`, `MAX_UPLOAD_BYTES`,
 * `PUBLIC_BASE_URL`
 */

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether requests without any credential are accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Missing credentials are rejected
    #[default]
    Enforced,
    /// Missing credentials are admitted as an anonymous identity
    Development,
}

/// What a session that has not (yet) authenticated may do in its room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnauthenticatedAccess {
    /// No document state until an in-band `auth` succeeds
    None,
    /// Snapshot and updates, but edits are refused
    #[default]
    ReadOnly,
    /// Full access
    ReadWrite,
}

impl UnauthenticatedAccess {
    pub fn allows_observe(self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn allows_edit(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Which identity provider validates bearer tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityProviderKind {
    /// HS256 JWTs signed with `jwt_secret`
    #[default]
    Jwt,
    /// Fixed token → user table from `static_tokens` (local development)
    Static,
}

/// Where snapshots and assets are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}

/// Authentication settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub provider: IdentityProviderKind,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: Option<String>,
    /// token → user id, used by the `static` provider
    pub static_tokens: HashMap<String, String>,
    pub unauthenticated_access: UnauthenticatedAccess,
}

/// Storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_url: "sqlite://xfboard.db".to_string(),
        }
    }
}

/// Room settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Persistence window in milliseconds
    pub persist_interval_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            persist_interval_ms: 10_000,
        }
    }
}

/// Asset gateway settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub max_upload_bytes: usize,
    /// Prefix for returned asset locations, e.g. `https://board.example.com`
    pub public_base_url: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
            public_base_url: None,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub rooms: RoomConfig,
    pub assets: AssetConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            rooms: RoomConfig::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `XFBOARD_CONFIG` (if set) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("XFBOARD_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.port = parse_value("SERVER_PORT", &port)?;
        }
        if let Some(mode) = lookup("AUTH_MODE") {
            self.auth.mode = parse_value("AUTH_MODE", &mode)?;
        }
        if let Some(provider) = lookup("IDENTITY_PROVIDER") {
            self.auth.provider = parse_value("IDENTITY_PROVIDER", &provider)?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.auth.jwt_issuer = Some(issuer);
        }
        if let Some(access) = lookup("UNAUTHENTICATED_ACCESS") {
            self.auth.unauthenticated_access = parse_value("UNAUTHENTICATED_ACCESS", &access)?;
        }
        if let Some(backend) = lookup("STORAGE_BACKEND") {
            self.storage.backend = parse_value("STORAGE_BACKEND", &backend)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Some(interval) = lookup("PERSIST_INTERVAL_MS") {
            self.rooms.persist_interval_ms = parse_value("PERSIST_INTERVAL_MS", &interval)?;
        }
        if let Some(max) = lookup("MAX_UPLOAD_BYTES") {
            self.assets.max_upload_bytes = parse_value("MAX_UPLOAD_BYTES", &max)?;
        }
        if let Some(base) = lookup("PUBLIC_BASE_URL") {
            self.assets.public_base_url = Some(base);
        }
        Ok(())
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.provider == IdentityProviderKind::Jwt
            && self.auth.jwt_secret.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingValue("auth.jwt_secret (JWT_SECRET)"));
        }
        if self.rooms.persist_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rooms.persist_interval_ms",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Persistence window as a `Duration`
    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.rooms.persist_interval_ms)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Parse a kebab-case enum name the same way serde would
fn parse_variant<T: for<'de> Deserialize<'de>>(value: &str) -> Result<T, ()> {
    T::deserialize(serde::de::value::StrDeserializer::<serde::de::value::Error>::new(
        value.trim(),
    ))
    .map_err(|_| ())
}

impl FromStr for AuthMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s)
    }
}

impl FromStr for UnauthenticatedAccess {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s)
    }
}

impl FromStr for IdentityProviderKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s)
    }
}

impl FromStr for StorageBackend {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s)
    }
}
