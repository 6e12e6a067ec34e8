//! `WebSocket` handler for the live dashboard stream.
//!
//! Clients connect to `GET /ws/dashboard`, receive one [`FleetUpdate`]
//! describing the current snapshot, then one more after every fleet
//! mutation. A client that falls behind skips to the newest update; the
//! full state can always be re-read from `/api/fleet`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use evofleet_types::{FleetSnapshot, FleetUpdate};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade to a `WebSocket` and stream fleet updates.
///
/// # Route
///
/// `GET /ws/dashboard`
pub async fn ws_dashboard(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Summary of a snapshot in update form, sent when a client connects.
pub fn initial_update(snapshot: &FleetSnapshot) -> FleetUpdate {
    FleetUpdate {
        sequence: snapshot.sequence,
        global_state: snapshot.global_state,
        state_changed: false,
        legality: snapshot.legality,
        worker_count: u32::try_from(snapshot.workers.len()).unwrap_or(u32::MAX),
        total_results: snapshot.total_results,
        touched_bucket: None,
    }
}

async fn send_update(socket: &mut WebSocket, update: &FleetUpdate) -> bool {
    let json = match serde_json::to_string(update) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize fleet update: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("Dashboard client connected");

    // Subscribe before reading the snapshot so nothing falls in between.
    let mut rx = state.subscribe_updates();
    if !send_update(&mut socket, &initial_update(&state.snapshot())).await {
        debug!("Dashboard client disconnected (send failed)");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(update) => {
                        if !send_update(&mut socket, &update).await {
                            debug!("Dashboard client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Dashboard client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Update channel closed, shutting down dashboard socket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Dashboard client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("Dashboard client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("Dashboard socket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
