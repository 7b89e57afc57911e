//! WebSocket and status endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::hub::{message::InboundPayload, registry::ConnectionHandle};

use super::state::AppState;

/// Value of the `status` field reported by the status endpoint.
pub const STATUS_LABEL: &str = "Chat Hub WS";

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Drive one connection: register it with the hub, forward hub frames to the
/// socket, and publish inbound payloads until either direction ends.
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Channel the hub uses to push frames to this connection.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(tx);
    let connection_id = handle.id();

    // Join before spawning the writer so the history replay is queued ahead
    // of any concurrent fan-out.
    state.hub.on_join(handle).await;

    // Writer: forward hub frames to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: parse inbound payloads and publish them.
    let hub = state.hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket read error on '{}': {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    // Missing fields are defaulted downstream; a payload that
                    // cannot be parsed at all ends this connection.
                    let payload = match serde_json::from_str::<InboundPayload>(&text) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::warn!(
                                "Unparseable payload from '{}', closing: {}",
                                connection_id,
                                e
                            );
                            break;
                        }
                    };

                    let message = hub.publish(payload).await;
                    tracing::debug!(
                        "Published message '{}' from connection '{}'",
                        message.id,
                        connection_id
                    );
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                    tracing::debug!("Received ping from '{}'", connection_id);
                }
                _ => {}
            }
        }
    });

    // If either task completes, abort the other.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.hub.on_leave(connection_id).await;
}

/// Response body of the status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub connections: usize,
}

/// Status surface: constant label plus the current registry size.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: STATUS_LABEL,
        connections: state.hub.connection_count().await,
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
