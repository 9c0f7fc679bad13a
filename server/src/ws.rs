// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::broadcast::UpdateBroadcaster;
use crate::routes::AppState;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Handler for `GET /api/updates`: upgrades the connection and streams
/// update events to the client until it disconnects.
pub async fn updates_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster))
}

/// Pushes every broadcast event to one connected client. The channel is
/// one-directional in practice: inbound frames are drained and ignored,
/// only close (or a transport error) ends the loop.
async fn handle_socket(socket: WebSocket, broadcaster: UpdateBroadcaster) {
    let mut events = broadcaster.subscribe();
    let (mut sink, mut stream) = socket.split();

    info!(
        "Update channel client connected ({} now subscribed).",
        broadcaster.subscriber_count()
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Failed to encode update event: {:?}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        // Client went away mid-send.
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Best-effort delivery: the client missed `skipped`
                    // events and will catch up on its next fetch.
                    warn!("Update channel client lagged, skipped {} events.", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(other)) => debug!("Ignoring inbound frame: {:?}", other),
                Some(Err(e)) => {
                    debug!("Update channel read error: {:?}", e);
                    break;
                }
            },
        }
    }

    info!("Update channel client disconnected.");
}
