//! Shared utilities used by both server and client.

pub mod logger;
pub mod time;
