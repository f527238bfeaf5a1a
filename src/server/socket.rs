//! WebSocket session handling.
//!
//! Each connection is one hub session. Outbound events are queued by the hub
//! into a bounded channel and forwarded as JSON text frames; inbound text
//! frames are parsed as client events.

use super::AppState;
use crate::board::Board;
use crate::hub::{ClientEvent, ServerEvent, SessionId};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

pub(super) async fn socket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.board))
}

async fn handle_socket(socket: WebSocket, board: Arc<Board>) {
    let hub = Arc::clone(board.hub());
    let (events_tx, mut events_rx) = mpsc::channel::<ServerEvent>(board.config().session_buffer_size);

    let id = match hub.connect(events_tx) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting websocket session");
            return;
        }
    };
    tracing::info!(session = %id, "New user connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                let Some(event) = event else {
                    // The hub dropped this session.
                    break;
                };
                if let Err(e) = forward_to_client(&mut ws_tx, &event).await {
                    tracing::debug!(session = %id, error = %e, "websocket send failed");
                    break;
                }
            }

            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => handle_client_text(&board, id, &text),
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(session = %id, error = %e, "websocket receive failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.disconnect(id);
    tracing::info!(session = %id, "User disconnected");
}

async fn forward_to_client(
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => ws_tx.send(WsMessage::Text(json)).await,
        Err(e) => {
            // Don't break the connection on a serialization error
            tracing::error!(error = %e, "failed to encode server event");
            Ok(())
        }
    }
}

fn handle_client_text(board: &Board, id: SessionId, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::ChatMessage(content)) => {
            board.hub().publish(id, content);
        }
        Err(e) => {
            tracing::debug!(session = %id, error = %e, "ignoring unrecognised client frame");
        }
    }
}
