//! WebSocket live channel — snapshot on connect, then placement events.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register with the broadcaster
//! 2. Send `canvas_update` with the full current state
//! 3. Forward `pixel_placed` / `pixel_batch` messages in emission order
//! 4. Close (client-initiated, or sender dropped by the overflow policy)
//!    → unsubscribe
//!
//! Viewers are read-only; placements go through `POST /api/place-pixel`.
//! Inbound frames other than close are ignored.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::warn;
use uuid::Uuid;

use crate::events::ServerMessage;
use crate::services::query;
use crate::state::AppState;

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let viewer_id = Uuid::new_v4();
    let mut rx = state.broadcaster.subscribe(viewer_id).await;

    // Full state first, so every later event applies on top of it.
    let canvas = query::canvas_wire(&state).await;
    let total_pixels = query::total_pixels(&state).await;
    let hello = ServerMessage::CanvasUpdate { canvas, total_pixels };
    if send_message(&mut socket, &hello).await.is_err() {
        state.broadcaster.unsubscribe(viewer_id).await;
        return;
    }

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let Some(Ok(message)) = inbound else { break };
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
            outbound = rx.recv() => {
                // None means the fan-out dropped this viewer (slow consumer).
                let Some(message) = outbound else { break };
                if send_message(&mut socket, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    state.broadcaster.unsubscribe(viewer_id).await;
}

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}
