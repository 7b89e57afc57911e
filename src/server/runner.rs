//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::hub::ChatHub;

use super::{
    handler::{health_check, status, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Build the router around a hub. Split out from [`run_server`] so tests can
/// serve it on an ephemeral port.
pub fn app(hub: ChatHub) -> Router {
    let app_state = Arc::new(AppState { hub });

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/", get(status))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Run the WebSocket chat server
///
/// # Arguments
///
/// * `host` - The host address to bind to (e.g., "127.0.0.1")
/// * `port` - The port number to bind to (e.g., 8000)
pub async fn run_server(host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = app(ChatHub::new());

    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(
        "WebSocket chat server listening on {}",
        listener.local_addr()?
    );
    tracing::info!("Connect to: ws://{}/ws", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
