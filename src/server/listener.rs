//! WebSocket listener and the relay's reactor loop

use super::connection::{handle_client, ClientEvent};
use super::hub::SessionHub;
use super::session::SessionHandle;
use crate::backend::{BackendBridge, BackendEndpoint, Datagram, Pacer};
use crate::config::Config;
use crate::protocol::Command;
use anyhow::{Context, Result};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Relay server: client listener plus backend socket, driven by one reactor
pub struct ServerListener {
    config: Config,
    listener: TcpListener,
    bridge: BackendBridge,
    poll_rx: mpsc::UnboundedReceiver<Command>,
}

impl ServerListener {
    /// Resolve the backend and bind both sockets
    pub async fn bind(config: Config) -> Result<Self> {
        let endpoint = BackendEndpoint::resolve(&config.backend.host, config.backend.port)
            .await
            .context("Invalid backend endpoint")?;

        let (pacer, poll_rx) = Pacer::new(&config.pacing);
        let bridge = BackendBridge::bind(config.backend.bind_addr, endpoint, pacer)
            .await
            .context("Cannot open backend channel")?;

        let listener = TcpListener::bind(config.server.listen_addr)
            .await
            .with_context(|| {
                format!(
                    "Failed to bind client listener on {}",
                    config.server.listen_addr
                )
            })?;

        Ok(Self {
            config,
            listener,
            bridge,
            poll_rx,
        })
    }

    /// Address clients connect to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Address the backend's replies must be sent to
    pub fn backend_local_addr(&self) -> Result<SocketAddr> {
        Ok(self.bridge.local_addr()?)
    }

    /// Run the reactor until a shutdown signal arrives
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        let ServerListener {
            config,
            listener,
            bridge,
            mut poll_rx,
        } = self;

        tracing::info!(
            "Listening for clients on ws://{}",
            listener.local_addr()?
        );
        tracing::info!(
            "Forwarding commands to {} from {}",
            bridge.endpoint(),
            bridge.local_addr()?
        );

        let (event_tx, mut event_rx) = mpsc::channel::<ClientEvent>(1024);
        let (datagram_tx, mut datagram_rx) = mpsc::channel::<Datagram>(256);
        let receiver = bridge.spawn_receiver(datagram_tx, config.backend.max_datagram_size);

        let mut hub = SessionHub::new();

        loop {
            tokio::select! {
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }

                // Accept new connections
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            let events = event_tx.clone();
                            let buffer = config.server.client_buffer;
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, peer, events, buffer).await {
                                    tracing::warn!(%peer, "Client error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                Some(event) = event_rx.recv() => {
                    handle_client_event(event, &mut hub, &bridge, &config);
                }

                Some(datagram) = datagram_rx.recv() => {
                    bridge.on_datagram(datagram, &mut hub);
                }

                Some(poll) = poll_rx.recv() => {
                    tracing::debug!(command = %poll, "Auto-poll due");
                    bridge.forward(&poll);
                }
            }
        }

        receiver.abort();
        tracing::info!(clients = hub.len(), "Relay stopped");

        Ok(())
    }
}

/// Shutdown channel for [`ServerListener::run`] that fires when `signal` completes.
///
/// If the signal cannot be installed the channel stays open forever, so the
/// relay keeps running instead of treating the failure as a shutdown.
pub fn shutdown_on<F>(signal: F) -> mpsc::Receiver<()>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });
    shutdown_rx
}

/// Apply one client event to the hub
fn handle_client_event(
    event: ClientEvent,
    hub: &mut SessionHub,
    bridge: &BackendBridge,
    config: &Config,
) {
    match event {
        ClientEvent::Connected(connection) => {
            hub.connect(connection);
            if config.pacing.poll_on_connect {
                bridge.poll_status();
            }
        }
        ClientEvent::Command { session, command } => {
            hub.on_client_message(&SessionHandle::new(session), command, bridge);
        }
        ClientEvent::Disconnected { session } => {
            hub.disconnect(&SessionHandle::new(session));
        }
    }
}
