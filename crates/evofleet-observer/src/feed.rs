//! Duplex `WebSocket` endpoint for the worker fleet's producer.
//!
//! The producer connects to `GET /ws/feed`. Text frames it sends are
//! queued to the fleet actor in arrival order; decoding happens there so
//! malformed frames are logged once, in one place. Command frames the
//! operator issues are written back on the same socket as they are
//! accepted.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Upgrade to a `WebSocket` and run the feed.
///
/// # Route
///
/// `GET /ws/feed`
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_feed(socket, state))
}

async fn handle_feed(socket: WebSocket, state: Arc<AppState>) {
    info!("Producer connected to feed");

    let (mut sink, mut stream) = socket.split();
    let mut commands = state.subscribe_commands();

    let writer = tokio::spawn(async move {
        loop {
            match commands.recv().await {
                Ok(frame) => {
                    let json = match serde_json::to_string(&frame) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!("Failed to serialize command frame: {e}");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        debug!("Feed send failed, stopping command writer");
                        return;
                    }
                    debug!(command = %frame.kind(), "Command written to feed");
                }
                Err(RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Feed writer lagged, commands dropped");
                }
                Err(RecvError::Closed) => return,
            }
        }
    });

    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Non-UTF-8 feed frame ignored");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(e) => {
                debug!("Feed socket error: {e}");
                break;
            }
        };
        if state.fleet().submit_frame(text).await.is_err() {
            warn!("Fleet actor stopped, closing feed");
            break;
        }
    }

    writer.abort();
    info!("Producer disconnected from feed");
}
