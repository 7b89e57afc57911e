//! WebSocket fan-out server: the transport layer around the hub.

mod handler;
mod runner;
mod signal;
mod state;

pub use handler::STATUS_LABEL;
pub use runner::{app, run_server};
