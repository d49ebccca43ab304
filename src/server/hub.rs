//! Session hub - the set of connected clients and broadcast fan-out

use super::connection::{ClientConnection, Delivery};
use super::session::{ClientSession, SessionHandle, SessionId, SessionInfo};
use crate::protocol::{Command, ServerMessage, StatusMessage};
use std::collections::HashMap;

/// Where the hub sends client commands.
///
/// Implemented by `BackendBridge`; tests substitute a recorder.
pub trait CommandSink {
    fn submit(&self, command: Command);
}

/// Tracks active client sessions. Owned by the reactor, so it needs no locking.
#[derive(Default)]
pub struct SessionHub {
    sessions: HashMap<SessionId, ClientSession>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client connection
    pub fn connect(&mut self, connection: ClientConnection) -> SessionHandle {
        let session = ClientSession::new(connection);
        let id = session.id();
        self.sessions.insert(id, session);
        tracing::debug!(session = %id, clients = self.sessions.len(), "Session registered");
        SessionHandle::new(id)
    }

    /// Remove a client connection. Returns false if it was already gone.
    pub fn disconnect(&mut self, handle: &SessionHandle) -> bool {
        let removed = self.sessions.remove(&handle.id()).is_some();
        if removed {
            tracing::debug!(
                session = %handle.id(),
                clients = self.sessions.len(),
                "Session removed"
            );
        }
        removed
    }

    /// Pass a client's command to the sink untouched
    pub fn on_client_message(
        &self,
        handle: &SessionHandle,
        command: Command,
        sink: &impl CommandSink,
    ) {
        tracing::info!(session = %handle.id(), %command, "Forwarding command");
        sink.submit(command);
    }

    /// Deliver a status message to every live session.
    ///
    /// Returns the number of sessions the message was queued for. Full or
    /// closed sessions are skipped.
    pub fn broadcast(&mut self, status: &StatusMessage) -> usize {
        let mut delivered = 0;
        for session in self.sessions.values_mut() {
            if !session.is_alive() {
                continue;
            }
            let msg = ServerMessage::StatusUpdate(status.clone());
            match session.connection().try_deliver(msg) {
                Delivery::Sent => delivered += 1,
                Delivery::Full => {
                    tracing::warn!(session = %session.id(), "Client queue full, dropping status update");
                }
                Delivery::Closed => {
                    tracing::debug!(session = %session.id(), "Client queue closed, skipping");
                    session.mark_dead();
                }
            }
        }
        delivered
    }

    pub fn contains(&self, handle: &SessionHandle) -> bool {
        self.sessions.contains_key(&handle.id())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn info(&self, handle: &SessionHandle) -> Option<SessionInfo> {
        self.sessions.get(&handle.id()).map(ClientSession::info)
    }
}
