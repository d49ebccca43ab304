//! Client connection handling

use super::session::SessionId;
use crate::protocol::{
    deserialize, serialize, ClientMessage, Command, ProtocolError, ServerMessage,
};
use anyhow::{anyhow, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// How long the writer gets to flush queued updates and the Close reply
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Outcome of a non-blocking delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Client queue is full; this message was dropped for this client only
    Full,
    /// Client writer is gone
    Closed,
}

/// Send side of a connected client
#[derive(Debug)]
pub struct ClientConnection {
    /// Unique client identifier
    id: SessionId,

    /// Remote address, if the client arrived over the network
    peer: Option<SocketAddr>,

    /// Channel to send messages to this client
    sender: mpsc::Sender<ServerMessage>,
}

impl ClientConnection {
    /// Create a new client connection
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: SessionId::new(),
            peer: None,
            sender,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Get client ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Queue a message for the client without waiting
    pub fn try_deliver(&self, msg: ServerMessage) -> Delivery {
        match self.sender.try_send(msg) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// Events the per-client tasks report to the reactor
#[derive(Debug)]
pub enum ClientEvent {
    Connected(ClientConnection),
    Command {
        session: SessionId,
        command: Command,
    },
    Disconnected {
        session: SessionId,
    },
}

/// Handle a single client connection from handshake to close
pub async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    events: mpsc::Sender<ClientEvent>,
    buffer: usize,
) -> Result<()> {
    let ws = accept_async(stream)
        .await
        .map_err(|e| anyhow!("WebSocket handshake with {} failed: {}", peer, e))?;
    let (sink, mut stream) = ws.split();

    // Create message channel for this client
    let (tx, rx) = mpsc::channel::<ServerMessage>(buffer.max(1));
    let client = ClientConnection::new(tx).with_peer(peer);
    let session = client.id();

    tracing::info!(%session, %peer, "Client connected");

    events
        .send(ClientEvent::Connected(client))
        .await
        .map_err(|_| anyhow!("Reactor stopped"))?;

    let mut writer_handle = tokio::spawn(client_writer_task(sink, rx));

    read_loop(&mut stream, session, &events).await;

    tracing::info!(%session, %peer, "Client disconnected");

    // The reactor may already be gone during shutdown
    let _ = events.send(ClientEvent::Disconnected { session }).await;

    // The hub drops the session's sender on disconnect, which lets the writer
    // finish the close handshake
    if timeout(CLOSE_TIMEOUT, &mut writer_handle).await.is_err() {
        tracing::debug!(%session, "Client writer did not finish in time");
        writer_handle.abort();
    }

    Ok(())
}

/// Read frames until the client goes away
async fn read_loop(
    stream: &mut WsStream,
    session: SessionId,
    events: &mpsc::Sender<ClientEvent>,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match parse_client_message(text.as_str()) {
                Ok(ClientMessage::Command(command)) => {
                    tracing::debug!(%session, %command, "Command received");
                    if events
                        .send(ClientEvent::Command { session, command })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(%session, "Ignoring frame: {}", e);
                }
            },
            Ok(Message::Binary(_)) => {
                tracing::warn!(
                    %session,
                    "Ignoring frame: {}",
                    ProtocolError::UnsupportedFrame("binary")
                );
            }
            Ok(Message::Close(_)) => break,
            // Pings are answered by tungstenite itself
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%session, "Error reading from client: {}", e);
                break;
            }
        }
    }
}

/// Task to write outgoing messages to the client
pub async fn client_writer_task(
    mut sink: WsSink,
    mut receiver: mpsc::Receiver<ServerMessage>,
) {
    while let Some(msg) = receiver.recv().await {
        let text = match serialize(&msg) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!("Failed to write message to client: {}", e);
            break;
        }
    }

    let _ = sink.close().await;
    tracing::debug!("Client writer task finished");
}

/// Parse a client message from a text frame
pub fn parse_client_message(text: &str) -> Result<ClientMessage> {
    deserialize(text)
}
