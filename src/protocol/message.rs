//! Message types for the client-facing channel

use super::{Command, StatusMessage};
use serde::{Deserialize, Serialize};

/// Messages sent from client to bridge
///
/// Wire form: `{"event":"command","data":"mode rock"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Text command for the backend
    Command(Command),
}

/// Messages sent from bridge to clients
///
/// Wire form: `{"event":"status_update","data":"tempo=120, mode=1, volume=80"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Status text relayed from the backend
    StatusUpdate(StatusMessage),
}
