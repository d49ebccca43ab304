//! Session bookkeeping - identity and liveness of a connected client

use super::connection::ClientConnection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use uuid::Uuid;

/// Opaque session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handle returned by `SessionHub::connect`, used for later hub calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    id: SessionId,
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }
}

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Unique session identifier
    pub id: SessionId,

    /// Remote address of the client, when known
    pub peer: Option<SocketAddr>,

    /// When the client connected
    pub connected_at: DateTime<Utc>,

    /// False once delivery to the client has found its queue closed
    pub alive: bool,
}

/// A connected client as tracked by the hub
pub struct ClientSession {
    connection: ClientConnection,
    connected_at: DateTime<Utc>,
    alive: bool,
}

impl ClientSession {
    pub fn new(connection: ClientConnection) -> Self {
        Self {
            connection,
            connected_at: Utc::now(),
            alive: true,
        }
    }

    pub fn id(&self) -> SessionId {
        self.connection.id()
    }

    pub fn connection(&self) -> &ClientConnection {
        &self.connection
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn mark_dead(&mut self) {
        self.alive = false;
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id(),
            peer: self.connection.peer(),
            connected_at: self.connected_at,
            alive: self.alive,
        }
    }
}
