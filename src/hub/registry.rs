//! Connection registry: the authoritative set of live connection handles.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Channel used to push outbound frames to one connection's writer task.
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery to a single connection failed; the connection should be pruned.
#[derive(Debug, Error)]
#[error("connection '{0}' is closed")]
pub struct DeliveryError(pub ConnectionId);

/// Opaque reference to one active client's transport.
///
/// Created on successful handshake, destroyed when the connection is removed
/// from the registry. Sending goes through an unbounded channel to the
/// connection's writer task, so delivery to one connection never blocks
/// delivery to another.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: OutboundSender,
}

impl ConnectionHandle {
    pub fn new(sender: OutboundSender) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Attempt to deliver one outbound frame.
    ///
    /// Fails when the connection's writer task has gone away (socket closed
    /// or errored), which is the signal to prune this connection.
    pub fn deliver(&self, frame: &str) -> Result<(), DeliveryError> {
        self.sender
            .send(frame.to_owned())
            .map_err(|_| DeliveryError(self.id))
    }
}

/// The live membership set.
///
/// Owned exclusively by the hub; membership changes only via join/leave, and
/// broadcast iterates over a point-in-time snapshot so concurrent removal
/// never corrupts an in-progress pass.
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle to the live set. The caller guarantees uniqueness.
    pub fn join(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.id(), handle);
    }

    /// Remove a handle if present. Removing an absent handle is a no-op,
    /// which supports double-removal from concurrent failure paths.
    pub fn leave(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// A point-in-time copy of the current membership for iteration by the
    /// broadcast step.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.connections.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
