//! Backend side of the relay - the single UDP channel to the backend process

mod bridge;
mod pacing;

pub use bridge::BackendBridge;
pub use pacing::{classify, Pacer, PollPolicy};

use std::fmt;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised while setting up the backend channel
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve backend {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Backend {host}:{port} resolved to no addresses")]
    NoAddress { host: String, port: u16 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The configured backend peer. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendEndpoint {
    addr: SocketAddr,
}

impl BackendEndpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Resolve `host:port`, taking the first address returned
    pub async fn resolve(host: &str, port: u16) -> Result<Self, BridgeError> {
        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| BridgeError::Resolve {
                host: host.to_string(),
                port,
                source,
            })?;
        addrs
            .next()
            .map(Self::new)
            .ok_or_else(|| BridgeError::NoAddress {
                host: host.to_string(),
                port,
            })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "udp://{}", self.addr)
    }
}

/// A datagram read from the backend socket
#[derive(Debug, Clone)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub source: SocketAddr,
}
