//! Wire shapes and server-side stamping.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::time::{Clock, to_utc_rfc3339};

/// Display name used when the client supplies no usable `user` field.
pub const ANONYMOUS_USER: &str = "Anon";

/// Inbound payload read from a connection.
///
/// Untrusted input: both fields are optional and any other field the client
/// sends (including `id` and `timestamp`) is dropped during deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct InboundPayload {
    pub user: Option<String>,
    pub text: Option<String>,
}

/// One broadcast chat message, as sent to every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-generated unique identifier, assigned at publish time
    pub id: String,
    /// Display name of the author
    pub user: String,
    /// Message body
    pub text: String,
    /// Publish time, ISO 8601 UTC with a trailing `Z`
    pub timestamp: String,
}

impl ChatMessage {
    /// Stamp an untrusted payload into a broadcastable message.
    ///
    /// `id` and `timestamp` are always assigned here, never taken from the
    /// client. A missing or empty `user` falls back to [`ANONYMOUS_USER`],
    /// and a missing `text` becomes the empty string.
    pub fn stamp(payload: InboundPayload, clock: &dyn Clock) -> Self {
        let user = match payload.user {
            Some(user) if !user.is_empty() => user,
            _ => ANONYMOUS_USER.to_string(),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            user,
            text: payload.text.unwrap_or_default(),
            timestamp: to_utc_rfc3339(clock.now_utc()),
        }
    }

    /// Serialize for the wire. ChatMessage contains only strings, so this
    /// cannot fail.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).expect("ChatMessage should serialize to JSON")
    }
}
