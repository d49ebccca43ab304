//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub pacing: PacingConfig,
}

/// Client-facing listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to
    pub listen_addr: SocketAddr,

    /// Per-client outbound queue capacity; updates beyond it are dropped for that client
    pub client_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8088)),
            client_buffer: 256,
        }
    }
}

/// Backend datagram peer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend host name or address
    pub host: String,

    /// Backend UDP port
    pub port: u16,

    /// Local address of the bridge's UDP socket (replies arrive here)
    pub bind_addr: SocketAddr,

    /// Receive buffer size; longer datagrams are truncated by the OS
    pub max_datagram_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 12345,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            max_datagram_size: MAX_UDP_PAYLOAD,
        }
    }
}

/// Auto-poll timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay before polling after a state-changing command
    pub short_delay_ms: u64,

    /// Delay before polling after `start_program`
    pub long_delay_ms: u64,

    /// Command sent to the backend to request status
    pub poll_command: String,

    /// Poll once when a client connects
    pub poll_on_connect: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            short_delay_ms: 50,
            long_delay_ms: 1000,
            poll_command: "get_status".to_string(),
            poll_on_connect: true,
        }
    }
}

impl PacingConfig {
    pub fn short_delay(&self) -> Duration {
        Duration::from_millis(self.short_delay_ms)
    }

    pub fn long_delay(&self) -> Duration {
        Duration::from_millis(self.long_delay_ms)
    }
}

impl Config {
    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, or return defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Replace file values with any given on the command line
    pub fn apply_overrides(
        &mut self,
        listen: Option<SocketAddr>,
        backend_host: Option<String>,
        backend_port: Option<u16>,
    ) {
        if let Some(listen) = listen {
            self.server.listen_addr = listen;
        }
        if let Some(host) = backend_host {
            self.backend.host = host;
        }
        if let Some(port) = backend_port {
            self.backend.port = port;
        }
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beatbridge")
            .join("config.toml")
    }
}
