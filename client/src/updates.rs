// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use common::UpdateEvent;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Derives the update channel URL from the service's HTTP base URL.
pub fn update_channel_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/api/updates")
}

/// Server-to-client event stream. The client never sends application
/// data over this connection.
pub struct UpdateStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

/// Connects to the service's update channel.
pub async fn connect(base_url: &str) -> Result<UpdateStream> {
    let url = update_channel_url(base_url);
    let (inner, _) = connect_async(&url)
        .await
        .with_context(|| format!("Failed to connect to update channel at {url}"))?;
    debug!("Connected to update channel at {}.", url);
    Ok(UpdateStream { inner })
}

impl UpdateStream {
    /// Waits for the next update event. Returns `None` once the server
    /// closes the connection or the transport fails; frames that do not
    /// parse are logged and skipped.
    pub async fn next_event(&mut self) -> Option<UpdateEvent> {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(Message::Text(text)) => match parse_event(&text) {
                    Some(event) => return Some(event),
                    None => warn!("Ignoring unparseable update frame: {}", text),
                },
                Ok(Message::Close(_)) => return None,
                Ok(other) => debug!("Ignoring non-text frame: {:?}", other),
                Err(e) => {
                    warn!("Update channel transport error: {:?}", e);
                    return None;
                }
            }
        }
        None
    }
}

fn parse_event(frame: &str) -> Option<UpdateEvent> {
    serde_json::from_str(frame).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_base_becomes_ws_url() {
        assert_eq!(
            update_channel_url("http://localhost:5001"),
            "ws://localhost:5001/api/updates"
        );
    }

    #[test]
    fn https_base_becomes_wss_url() {
        assert_eq!(
            update_channel_url("https://tasks.example.com/"),
            "wss://tasks.example.com/api/updates"
        );
    }

    #[test]
    fn task_updated_frame_parses() {
        let event = parse_event(r#"{"event":"task_updated","taskId":7}"#).unwrap();
        assert_eq!(event, UpdateEvent::task_updated(7));
    }

    #[test]
    fn garbage_frame_is_rejected() {
        assert!(parse_event("not json").is_none());
    }
}
