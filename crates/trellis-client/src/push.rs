//! Push notifications from the workspace server

use anyhow::{Context, Result};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

/// Messages the workspace server pushes to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushMessage {
    /// Pending changes in a workspace were added, applied, or discarded.
    #[serde(rename = "workspaceChanged", rename_all = "camelCase")]
    WorkspaceChanged { workspace_id: String },
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
}

/// Derive the push endpoint from an HTTP base URL.
pub fn push_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws}/ws")
}

/// Connect to the push channel and stream decoded messages.
///
/// Undecodable frames are logged and skipped. The stream ends when the
/// server closes the socket; reconnecting is the caller's call.
pub async fn connect_push(ws_url: &str) -> Result<impl Stream<Item = PushMessage>> {
    let (socket, _) = connect_async(ws_url)
        .await
        .context("connecting to workspace push channel")?;
    Ok(socket.filter_map(|frame| async move {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<PushMessage>(&text) {
                Ok(message) => Some(message),
                Err(err) => {
                    warn!("skipping unparseable push message: {err}");
                    None
                }
            },
            Ok(_) => None,
            Err(err) => {
                warn!("push channel error: {err}");
                None
            }
        }
    }))
}
