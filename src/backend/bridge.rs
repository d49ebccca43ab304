//! Backend bridge - forwards commands as datagrams and relays replies to the hub

use super::{BackendEndpoint, BridgeError, Datagram, Pacer};
use crate::protocol::{Command, StatusMessage};
use crate::server::{CommandSink, SessionHub};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Owns the one UDP socket shared with the backend.
///
/// Outgoing commands go through an ordered queue drained by a single writer
/// task; the receiver task spawned by [`BackendBridge::spawn_receiver`] is the
/// only reader.
pub struct BackendBridge {
    socket: Arc<UdpSocket>,
    endpoint: BackendEndpoint,
    pacer: Pacer,
    outbound: mpsc::UnboundedSender<Command>,
}

impl BackendBridge {
    /// Bind the local socket replies will arrive on
    pub async fn bind(
        bind_addr: SocketAddr,
        endpoint: BackendEndpoint,
        pacer: Pacer,
    ) -> Result<Self, BridgeError> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| BridgeError::Bind {
                addr: bind_addr,
                source,
            })?;
        let socket = Arc::new(socket);

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(send_loop(Arc::clone(&socket), endpoint, outbound_rx));

        Ok(Self {
            socket,
            endpoint,
            pacer,
            outbound,
        })
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BridgeError> {
        Ok(self.socket.local_addr()?)
    }

    /// Queue one datagram carrying the command text.
    ///
    /// Never waits. Send failures are logged by the writer task and dropped;
    /// returns false only if the writer is gone.
    pub fn forward(&self, command: &Command) -> bool {
        match self.outbound.send(command.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(%command, "Backend writer stopped, dropping command");
                false
            }
        }
    }

    /// Forward the configured status poll command
    pub fn poll_status(&self) -> bool {
        self.forward(self.pacer.poll_command())
    }

    /// Decode a backend datagram and broadcast it to every session.
    ///
    /// Returns the number of sessions it was queued for.
    pub fn on_datagram(&self, datagram: Datagram, hub: &mut SessionHub) -> usize {
        if datagram.source != self.endpoint.addr() {
            // Not rejected: anything arriving on the bound port is treated as backend output.
            tracing::debug!(
                source = %datagram.source,
                backend = %self.endpoint,
                "Datagram from unexpected source"
            );
        }

        let (status, lossy) = StatusMessage::from_datagram(&datagram.payload);
        if lossy {
            tracing::warn!(source = %datagram.source, "Status datagram is not valid UTF-8");
        }

        let fields = status.fields();
        tracing::debug!(
            source = %datagram.source,
            tempo = ?fields.tempo,
            mode = ?fields.mode,
            volume = ?fields.volume,
            "Backend status: {:?}",
            status.as_str()
        );

        let delivered = hub.broadcast(&status);
        tracing::info!(delivered, clients = hub.len(), "Status broadcast");
        delivered
    }

    /// Spawn the task that reads datagrams and hands them to the reactor
    pub fn spawn_receiver(
        &self,
        tx: mpsc::Sender<Datagram>,
        max_datagram_size: usize,
    ) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        tokio::spawn(receive_loop(socket, tx, max_datagram_size.max(1)))
    }
}

impl CommandSink for BackendBridge {
    fn submit(&self, command: Command) {
        self.forward(&command);
        self.pacer.after_command(&command);
    }
}

/// Writer task: one datagram per queued command, in order
async fn send_loop(
    socket: Arc<UdpSocket>,
    endpoint: BackendEndpoint,
    mut outbound: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = outbound.recv().await {
        let payload = command.as_bytes();
        match socket.send_to(payload, endpoint.addr()).await {
            Ok(sent) if sent == payload.len() => {
                tracing::debug!(%command, backend = %endpoint, bytes = sent, "Datagram sent");
            }
            Ok(sent) => {
                tracing::warn!(%command, bytes = sent, expected = payload.len(), "Short datagram send");
            }
            Err(e) => {
                tracing::warn!(%command, backend = %endpoint, "Failed to send datagram: {}", e);
            }
        }
    }
    tracing::debug!("Backend writer task finished");
}

async fn receive_loop(socket: Arc<UdpSocket>, tx: mpsc::Sender<Datagram>, max: usize) {
    let mut buf = vec![0u8; max];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, source)) => {
                let datagram = Datagram {
                    payload: buf[..len].to_vec(),
                    source,
                };
                if tx.send(datagram).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                // ICMP errors from an absent backend surface here; keep listening
                tracing::debug!("Error receiving datagram: {}", e);
            }
        }
    }
    tracing::debug!("Backend receiver task finished");
}
