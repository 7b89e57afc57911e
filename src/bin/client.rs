//! CLI chat client for the fan-out hub.
//!
//! Connects to the chat server, prints every broadcast message (including
//! the recent history replayed on join), and sends typed lines as chat
//! messages. Automatically reconnects on disconnection (max 5 attempts
//! with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin client -- --user Alice
//! cargo run --bin client -- -u Bob --url ws://127.0.0.1:8000/ws
//! ```

use clap::Parser;

use chat_hub_rs::{client::run_client, common::logger::setup_logger};

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "CLI chat client for the WebSocket fan-out hub", long_about = None)]
struct Args {
    /// Display name attached to sent messages (the server substitutes an
    /// anonymous label when omitted on the wire)
    #[arg(short = 'u', long, default_value = "Anon")]
    user: String,

    /// WebSocket server URL
    #[arg(long, default_value = "ws://127.0.0.1:8000/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run_client(args.url, args.user).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
