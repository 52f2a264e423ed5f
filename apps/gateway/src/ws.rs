//! Duplex endpoint: axum upgrade handler and connection loop.
//!
//! Each socket registers with the connection registry under its channel,
//! receives envelopes through a writer task, and is unregistered when the
//! client goes away. Inbound text is only logged.

use crate::{auth::Authenticator, state::AppState};
use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use relay::Envelope;
use tokio::sync::mpsc;

/// WebSocket upgrade handler.
pub(crate) async fn ws_handler<A: Authenticator + 'static>(
    State(state): State<AppState<A>>,
    Path(channel): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, channel, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket<A: Authenticator + 'static>(
    socket: WebSocket,
    channel: String,
    state: AppState<A>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

    let connections = state.gateway.connections().clone();
    let id = connections.connect(&channel, tx);
    tracing::info!("client connected on {channel}");

    // Writer task: forward envelopes to the socket. On a failed write the
    // envelope and everything still queued go back to the channel backlog.
    let send_task = {
        let connections = connections.clone();
        let channel = channel.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let json = match serde_json::to_string(&envelope) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!("failed to serialize envelope: {e}");
                        continue;
                    }
                };
                if let Err(e) = sender.send(WsMessage::Text(json.into())).await {
                    tracing::warn!("write to {channel} failed: {e}");
                    connections.requeue(&channel, id, vec![envelope], &mut rx);
                    break;
                }
            }
        })
    };

    while let Some(message) = receiver.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                tracing::debug!("received from {channel}: {}", text.as_str());
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("websocket error on {channel}: {e}");
                break;
            }
        }
    }

    // Dropping the registry's sender ends the writer task.
    connections.disconnect(&channel, id);
    let _ = send_task.await;
    tracing::info!("client on {channel} disconnected");
}
