//! End-to-end room tests over real WebSockets
//!
//! Each test serves the app on a loopback port and talks to it with
//! tokio-tungstenite clients.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use common::{connect, expect_message, recv, send, send_raw, TestApp};
use xfboard::backend::collab::document::TextDocument;
use xfboard::backend::server::config::{AuthMode, UnauthenticatedAccess};
use xfboard::backend::storage::{snapshot_key, BlobStore};
use xfboard::shared::{CRDTOperation, ClientMessage, ServerMessage};

fn ops(operations: Vec<CRDTOperation>) -> ClientMessage {
    ClientMessage::Ops { operations }
}

#[tokio::test]
async fn test_edit_is_acknowledged_and_persisted_on_flush() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", Some("t1")).await;
    assert_eq!(
        expect_message(&mut client).await,
        ServerMessage::Snapshot {
            content: String::new(),
            version: 0
        }
    );

    send(&mut client, &ops(vec![CRDTOperation::insert(0, "hello")])).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::Ack { version } if version > 0);

    let (written, failures) = app.state.rooms.flush_all().await;
    assert_eq!(written, 1);
    assert!(failures.is_empty());

    let stored = app.store.get(&snapshot_key("r1")).await.unwrap().unwrap();
    let document = TextDocument::from_snapshot(&stored.body).unwrap();
    assert_eq!(document.content(), "hello");
}

#[tokio::test]
async fn test_window_elapses_into_one_snapshot_write() {
    let app = TestApp::with_persist_interval(Duration::from_millis(300));
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", Some("t1")).await;
    expect_message(&mut client).await;

    // Two edits inside one window
    send(&mut client, &ops(vec![CRDTOperation::insert(0, "hello")])).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::Ack { .. });
    send(&mut client, &ops(vec![CRDTOperation::insert(5, " world")])).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::Ack { .. });
    assert_eq!(app.store.write_count(), 0);

    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(app.store.keys().await, vec!["rooms/r1".to_string()]);
    assert_eq!(app.store.write_count(), 1);

    let stored = app.store.get("rooms/r1").await.unwrap().unwrap();
    let document = TextDocument::from_snapshot(&stored.body).unwrap();
    assert_eq!(document.content(), "hello world");
    assert!(!app.state.rooms.get("r1").await.unwrap().is_dirty());
}

#[tokio::test]
async fn test_updates_reach_other_sessions_only() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut alice = connect(addr, "board", "a", Some("t1")).await;
    let mut bob = connect(addr, "board", "b", Some("t2")).await;
    assert_matches!(expect_message(&mut alice).await, ServerMessage::Snapshot { .. });
    assert_matches!(expect_message(&mut bob).await, ServerMessage::Snapshot { .. });

    send(&mut alice, &ops(vec![CRDTOperation::insert(0, "hi")])).await;

    match expect_message(&mut bob).await {
        ServerMessage::Update { origin, operations, .. } => {
            assert_eq!(origin, "a");
            assert_eq!(operations, vec![CRDTOperation::insert(0, "hi")]);
        }
        other => panic!("Expected Update, got {:?}", other),
    }
    // The origin gets an ack, not its own update
    assert_matches!(expect_message(&mut alice).await, ServerMessage::Ack { .. });

    let state = app.state.rooms.get("board").await.unwrap().state().await;
    assert_eq!(state.content, "hi");
}

#[tokio::test]
async fn test_late_joiner_sees_current_content() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut first = connect(addr, "r1", "s1", Some("t1")).await;
    expect_message(&mut first).await;
    send(&mut first, &ops(vec![CRDTOperation::insert(0, "abc"), CRDTOperation::delete(0, 1)])).await;
    assert_matches!(expect_message(&mut first).await, ServerMessage::Ack { .. });

    let mut second = connect(addr, "r1", "s2", Some("t2")).await;
    assert_matches!(
        expect_message(&mut second).await,
        ServerMessage::Snapshot { content, .. } if content == "bc"
    );
}

#[tokio::test]
async fn test_out_of_bounds_batch_is_denied_and_not_applied() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", Some("t1")).await;
    expect_message(&mut client).await;

    send(
        &mut client,
        &ops(vec![CRDTOperation::insert(0, "ok"), CRDTOperation::delete(5, 9)]),
    )
    .await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::Denied { .. });

    let state = app.state.rooms.get("r1").await.unwrap().state().await;
    assert_eq!(state.content, "");
    assert!(!app.state.rooms.get("r1").await.unwrap().is_dirty());
}

#[tokio::test]
async fn test_in_band_auth_in_development_mode() {
    let app = TestApp::with_policy(AuthMode::Development, UnauthenticatedAccess::ReadOnly);
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", None).await;
    // Read-only observers get the snapshot straight away
    assert_matches!(expect_message(&mut client).await, ServerMessage::Snapshot { .. });

    send(&mut client, &ops(vec![CRDTOperation::insert(0, "x")])).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::Denied { .. });

    send(&mut client, &ClientMessage::Auth { token: "t1".to_string() }).await;
    assert_eq!(
        expect_message(&mut client).await,
        ServerMessage::AuthOk {
            user_id: "u1".to_string()
        }
    );

    send(&mut client, &ops(vec![CRDTOperation::insert(0, "x")])).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::Ack { .. });
}

#[tokio::test]
async fn test_snapshot_withheld_until_auth_when_access_is_none() {
    let app = TestApp::with_policy(AuthMode::Development, UnauthenticatedAccess::None);
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", None).await;
    send(&mut client, &ClientMessage::Ping).await;
    // Nothing was queued ahead of the pong
    assert_eq!(expect_message(&mut client).await, ServerMessage::Pong);

    send(&mut client, &ClientMessage::Auth { token: "t2".to_string() }).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::AuthOk { .. });
    assert_matches!(expect_message(&mut client).await, ServerMessage::Snapshot { .. });
}

#[tokio::test]
async fn test_invalid_in_band_token_closes_unauthenticated_session() {
    let app = TestApp::with_policy(AuthMode::Development, UnauthenticatedAccess::ReadOnly);
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", None).await;
    expect_message(&mut client).await;

    send(&mut client, &ClientMessage::Auth { token: "nope".to_string() }).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::AuthDenied { .. });
    assert_eq!(recv(&mut client).await, None);

    let room = app.state.rooms.get("r1").await.unwrap();
    assert_eq!(room.session_count().await, 0);
}

#[tokio::test]
async fn test_invalid_in_band_token_keeps_authenticated_session() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", Some("t1")).await;
    expect_message(&mut client).await;

    send(&mut client, &ClientMessage::Auth { token: "nope".to_string() }).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::AuthDenied { .. });

    send(&mut client, &ops(vec![CRDTOperation::insert(0, "still here")])).await;
    assert_matches!(expect_message(&mut client).await, ServerMessage::Ack { .. });
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut client = connect(addr, "r1", "s1", Some("t1")).await;
    expect_message(&mut client).await;

    send_raw(&mut client, "not json").await;
    send_raw(&mut client, r#"{"type":"shout","text":"hi"}"#).await;
    send(&mut client, &ClientMessage::Ping).await;

    assert_eq!(expect_message(&mut client).await, ServerMessage::Pong);
}

#[tokio::test]
async fn test_reused_session_id_replaces_older_connection() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut old = connect(addr, "r1", "s1", Some("t1")).await;
    expect_message(&mut old).await;

    let mut new = connect(addr, "r1", "s1", Some("t1")).await;
    assert_matches!(expect_message(&mut new).await, ServerMessage::Snapshot { .. });
    assert_eq!(recv(&mut old).await, None);

    send(&mut new, &ClientMessage::Ping).await;
    assert_eq!(expect_message(&mut new).await, ServerMessage::Pong);

    let room = app.state.rooms.get("r1").await.unwrap();
    assert_eq!(room.session_count().await, 1);
}

#[tokio::test]
async fn test_room_is_loaded_once_for_concurrent_connections() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut a = connect(addr, "shared", "a", Some("t1")).await;
    let mut b = connect(addr, "shared", "b", Some("t2")).await;
    expect_message(&mut a).await;
    expect_message(&mut b).await;

    assert_eq!(app.store.read_count(), 1);
    assert_eq!(app.state.rooms.len().await, 1);
}

#[tokio::test]
async fn test_sessions_listing_follows_joins_and_leaves() {
    let app = TestApp::new();
    let addr = app.spawn().await;

    let mut alice = connect(addr, "board", "a", Some("t1")).await;
    let bob = {
        let mut bob = connect(addr, "board", "b", Some("t2")).await;
        expect_message(&mut bob).await;
        bob
    };
    expect_message(&mut alice).await;

    let list = |app: &TestApp| {
        app.router().oneshot(
            Request::get("/rooms/board/sessions")
                .header(header::AUTHORIZATION, "Bearer t1")
                .body(Body::empty())
                .unwrap(),
        )
    };

    let response = list(&app).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let sessions: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
    let mut users: Vec<(String, String)> = sessions
        .iter()
        .map(|s| (s["sessionId"].as_str().unwrap().to_string(), s["userId"].as_str().unwrap().to_string()))
        .collect();
    users.sort();
    assert_eq!(
        users,
        vec![("a".to_string(), "u1".to_string()), ("b".to_string(), "u2".to_string())]
    );
    assert!(sessions.iter().all(|s| s["state"] == "authenticated" && s["connectedAt"].is_string()));

    drop(bob);
    let room = app.state.rooms.get("board").await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while room.session_count().await > 1 {
        assert!(tokio::time::Instant::now() < deadline, "closed session was never removed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let response = list(&app).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let sessions: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["sessionId"], "a");
}
