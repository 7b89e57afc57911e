//! Shared server state.

use crate::hub::ChatHub;

/// Shared application state: the single hub instance for this process,
/// created at startup and torn down at shutdown.
pub struct AppState {
    pub hub: ChatHub,
}
