/**
 * Room Connection
 *
 * Drives one upgraded WebSocket: a reader loop that feeds client messages to
 * the room, and a writer task that drains the session's outbox into the
 * socket. The reader applies messages strictly in the order received.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::room::{ApplyOutcome, Room};
use super::sessions::{Outbound, Session};
use crate::backend::auth::{AuthGateway, Identity};
use crate::shared::{ClientMessage, ServerMessage};

/// How long the writer may keep flushing after the reader stops
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

enum Flow {
    Continue,
    Stop,
}

/// Serve a socket that was admitted to `room` as `session_id`
pub async fn serve(socket: WebSocket, room: Arc<Room>, session_id: String, identity: Identity, gateway: AuthGateway) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let session = room.join(&session_id, &identity, tx.clone()).await;

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Outbound::Message(message) => match serde_json::to_string(&message) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!("[Connection] Failed to serialize message: {}", e),
                },
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    while let Some(result) = stream.next().await {
        let flow = match result {
            Ok(Message::Text(text)) => match ClientMessage::parse(text.as_str()) {
                Ok(message) => handle_message(message, &room, &session, &gateway, &tx).await,
                Err(e) => {
                    tracing::debug!(session_id = %session.session_id, "[Connection] Ignoring malformed message: {}", e);
                    Flow::Continue
                }
            },
            Ok(Message::Binary(data)) => {
                tracing::debug!(session_id = %session.session_id, bytes = data.len(), "[Connection] Ignoring binary frame");
                Flow::Continue
            }
            Ok(Message::Close(_)) => Flow::Stop,
            // Ping/Pong are answered by the WebSocket layer
            Ok(_) => Flow::Continue,
            Err(e) => {
                tracing::warn!(session_id = %session.session_id, "[Connection] TransportFailure: {}", e);
                Flow::Stop
            }
        };

        if matches!(flow, Flow::Stop) || writer.is_finished() {
            break;
        }
    }

    room.leave(&session).await;
    drop(tx);
    let _ = tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await;

    tracing::info!(
        room_id = %room.id(),
        session_id = %session.session_id,
        "[Connection] Closed"
    );
}

async fn handle_message(
    message: ClientMessage,
    room: &Room,
    session: &Session,
    gateway: &AuthGateway,
    tx: &mpsc::UnboundedSender<Outbound>,
) -> Flow {
    match message {
        ClientMessage::Auth { token } => match gateway.authenticate_token(&token).await {
            Ok(user) => {
                if room.authenticate_session(session, &user.user_id).await {
                    Flow::Continue
                } else {
                    Flow::Stop
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %session.session_id, "[Auth] In-band credential rejected: {}", e);
                if room.reject_credential(session, &e.to_string()).await {
                    Flow::Stop
                } else {
                    Flow::Continue
                }
            }
        },
        ClientMessage::Ops { operations } => match room.apply(session, &operations).await {
            ApplyOutcome::Gone => Flow::Stop,
            _ => Flow::Continue,
        },
        ClientMessage::Ping => {
            let _ = tx.send(Outbound::Message(ServerMessage::Pong));
            Flow::Continue
        }
    }
}
