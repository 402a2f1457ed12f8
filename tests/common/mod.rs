//! Common test utilities and helpers
//!
//! Builds application state on an in-memory store with a static identity
//! provider, serves it on a loopback port and drives WebSocket clients.
//!
//! Known tokens:
//! - `t1` → user `u1`
//! - `t2` → user `u2`

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use xfboard::backend::assets::AssetGateway;
use xfboard::backend::auth::{AuthGateway, StaticIdentityProvider};
use xfboard::backend::collab::{RoomRegistry, RoomSettings};
use xfboard::backend::server::config::{AuthMode, IdentityProviderKind, ServerConfig, StorageBackend, UnauthenticatedAccess};
use xfboard::backend::server::{create_app, AppState};
use xfboard::backend::storage::MemoryStore;
use xfboard::backend::unfurl::Unfurler;
use xfboard::shared::{ClientMessage, ServerMessage};

/// How long a client waits for a frame before the test fails
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Application state plus the store behind it, for assertions on persisted data
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Enforced auth, read-only unauthenticated access
    pub fn new() -> Self {
        Self::with_policy(AuthMode::Enforced, UnauthenticatedAccess::ReadOnly)
    }

    pub fn with_policy(mode: AuthMode, access: UnauthenticatedAccess) -> Self {
        // Long window: tests persist through flush_all
        Self::build(mode, access, Duration::from_secs(60))
    }

    /// Enforced auth with a short persistence window, for tests that let it elapse
    pub fn with_persist_interval(interval: Duration) -> Self {
        Self::build(AuthMode::Enforced, UnauthenticatedAccess::ReadOnly, interval)
    }

    fn build(mode: AuthMode, access: UnauthenticatedAccess, interval: Duration) -> Self {
        let mut config = ServerConfig::default();
        config.auth.mode = mode;
        config.auth.provider = IdentityProviderKind::Static;
        config.auth.unauthenticated_access = access;
        config.auth.static_tokens = HashMap::from([
            ("t1".to_string(), "u1".to_string()),
            ("t2".to_string(), "u2".to_string()),
        ]);
        config.storage.backend = StorageBackend::Memory;
        config.rooms.persist_interval_ms = interval.as_millis() as u64;

        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(StaticIdentityProvider::new(config.auth.static_tokens.clone()));
        let settings = RoomSettings {
            persist_interval: config.persist_interval(),
            unauthenticated_access: access,
        };

        let state = AppState {
            rooms: Arc::new(RoomRegistry::new(store.clone(), settings)),
            gateway: AuthGateway::new(provider, mode),
            assets: AssetGateway::new(store.clone(), config.assets.max_upload_bytes, None),
            unfurler: Unfurler::new(),
            config: Arc::new(config),
        };

        Self { state, store }
    }

    pub fn router(&self) -> axum::Router {
        create_app(self.state.clone())
    }

    /// Serve the app on a random loopback port
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server error");
        });
        addr
    }
}

/// Open a room connection; `query` is appended to `sessionId=..`
pub async fn connect(addr: SocketAddr, room_id: &str, session_id: &str, auth: Option<&str>) -> Client {
    let mut url = format!("ws://{}/connect/{}?sessionId={}", addr, room_id, session_id);
    if let Some(token) = auth {
        url.push_str(&format!("&auth={}", token));
    }
    let (client, _response) = connect_async(url).await.expect("websocket handshake");
    client
}

pub async fn send(client: &mut Client, message: &ClientMessage) {
    let json = serde_json::to_string(message).expect("serialize client message");
    client.send(Message::text(json)).await.expect("send frame");
}

pub async fn send_raw(client: &mut Client, text: &str) {
    client.send(Message::text(text.to_string())).await.expect("send frame");
}

/// Next server message, skipping transport-level frames.
///
/// Returns `None` once the server closes the connection.
pub async fn recv(client: &mut Client) -> Option<ServerMessage> {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a frame");
        match frame {
            Some(Ok(Message::Text(text))) => {
                return Some(serde_json::from_str(text.as_str()).expect("server sent valid JSON"));
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

/// Next server message, failing the test if the connection closed
pub async fn expect_message(client: &mut Client) -> ServerMessage {
    recv(client).await.expect("connection closed unexpectedly")
}
