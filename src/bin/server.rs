//! WebSocket chat fan-out server.
//!
//! Accepts WebSocket connections, stamps every submitted message with a
//! server-assigned id and UTC timestamp, and broadcasts it to all connected
//! clients (sender included). New joiners receive the most recent history.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server
//! cargo run --bin server -- --host 127.0.0.1 --port 3000
//! ```

use clap::Parser;

use chat_hub_rs::{common::logger::setup_logger, server::run_server};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "WebSocket chat fan-out server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8000")]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    if let Err(e) = run_server(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
