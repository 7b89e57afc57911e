//! WebSocket chat fan-out hub.
//!
//! This library provides a single-process broadcast hub plus the thin
//! transport pieces around it: every message published by any client is
//! stamped by the server and delivered to all connected clients, and new
//! joiners receive a bounded replay of recent history.

// core
pub mod hub;

// transport and CLI client (thin wrappers around the hub)
pub mod client;
pub mod server;

// shared library
pub mod common;
