//! Server module - WebSocket listener, client connections and the session hub

mod connection;
mod hub;
mod listener;
mod session;

pub use connection::{handle_client, ClientConnection, ClientEvent, Delivery};
pub use hub::{CommandSink, SessionHub};
pub use listener::{shutdown_on, ServerListener};
pub use session::{ClientSession, SessionHandle, SessionId, SessionInfo};
