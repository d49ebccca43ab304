//! Protocol definitions for the client-facing channel and the backend payloads
//!
//! Clients speak JSON envelopes over WebSocket text frames. The backend speaks
//! raw ASCII datagrams; `Command` and `StatusMessage` are the opaque text values
//! that travel between the two.

mod message;
mod status;

pub use message::{ClientMessage, ServerMessage};
pub use status::StatusFields;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(&'static str),
}

/// A command issued by a client, forwarded to the backend verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Datagram payload for this command. No framing, no terminator.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status text emitted by the backend and broadcast to every client.
///
/// The payload is never inspected for routing; see [`StatusFields`] for the
/// read-only view used in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Decode a datagram payload.
    ///
    /// Returns the message and whether the decode was lossy (payload was not
    /// valid UTF-8).
    pub fn from_datagram(payload: &[u8]) -> (Self, bool) {
        match std::str::from_utf8(payload) {
            Ok(text) => (Self(text.to_string()), false),
            Err(_) => (Self(String::from_utf8_lossy(payload).into_owned()), true),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn fields(&self) -> StatusFields {
        StatusFields::parse(&self.0)
    }
}

impl From<&str> for StatusMessage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize a message to a JSON text frame payload
pub fn serialize<T: Serialize>(msg: &T) -> Result<String> {
    Ok(serde_json::to_string(msg)?)
}

/// Deserialize a message from a JSON text frame payload
pub fn deserialize<'a, T: Deserialize<'a>>(text: &'a str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| {
        anyhow!(ProtocolError::MalformedMessage(format!(
            "Failed to deserialize: {}",
            e
        )))
    })
}
