//! WebSocket handler for realtime match outcomes.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{user_id}`
//! 2. The socket joins the user's room in the session hub
//! 3. Every match event addressed to the user is pushed as a JSON text frame
//! 4. On disconnect the session leaves the room
//!
//! Delivery is best-effort: events for a user without an open socket are
//! dropped, and nothing is replayed on reconnect. Clients that need the
//! current picture fetch `GET /api/v1/contests/{id}/matches/active`.
//!
//! # Client Messages
//!
//! `{"type": "ping"}` is answered with `{"type": "pong"}`; anything else gets
//! an error frame.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/ada');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === 'match_event') {
//!     showOutcome(data.event);
//!   }
//! };
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use knockout::MatchEvent;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::metrics;

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage<'a> {
    MatchEvent { event: &'a MatchEvent },
    Pong,
    Error { message: String },
}

/// Upgrade HTTP connection to WebSocket for realtime match outcomes.
///
/// # Path Parameters
///
/// - `user_id`: Participant whose events should be delivered
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, user_id: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let subscription = state.sessions.subscribe(&user_id);
    let session_id = subscription.id;
    let mut events = subscription.receiver;

    metrics::websocket_connections_total();
    metrics::websocket_sessions_active(state.sessions.session_count());
    info!("WebSocket connected: user={}, session={}", user_id, session_id);

    // Replies to client frames go through the send task so the sink has a single owner
    let (reply_tx, mut reply_rx) = tokio::sync::mpsc::channel::<String>(8);

    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(event) = events.recv() => {
                    match serde_json::to_string(&ServerMessage::MatchEvent { event: &event }) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialize match event: {}", e);
                            continue;
                        }
                    }
                }
                Some(reply) = reply_rx.recv() => reply,
                else => break,
            };

            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Ping) => ServerMessage::Pong,
                        Err(e) => {
                            warn!("Failed to parse client message: {}", e);
                            ServerMessage::Error {
                                message: "Invalid message format".to_string(),
                            }
                        }
                    };

                    if let Ok(json) = serde_json::to_string(&reply)
                        && reply_tx.send(json).await.is_err()
                    {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Whichever side finishes first ends the session
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.sessions.unsubscribe(&user_id, session_id);
    metrics::websocket_sessions_active(state.sessions.session_count());

    info!(
        "WebSocket disconnected: user={}, session={}",
        user_id, session_id
    );
}
