//! Integration tests for SessionHub

use beatbridge::protocol::{Command, ServerMessage, StatusMessage};
use beatbridge::server::{ClientConnection, CommandSink, SessionHub};
use std::cell::RefCell;
use tokio::sync::mpsc;

/// Records everything the hub submits
#[derive(Default)]
struct RecordingSink {
    commands: RefCell<Vec<Command>>,
}

impl CommandSink for RecordingSink {
    fn submit(&self, command: Command) {
        self.commands.borrow_mut().push(command);
    }
}

fn client(buffer: usize) -> (ClientConnection, mpsc::Receiver<ServerMessage>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ClientConnection::new(tx), rx)
}

fn status_text(msg: ServerMessage) -> String {
    match msg {
        ServerMessage::StatusUpdate(status) => status.as_str().to_string(),
    }
}

#[test]
fn test_connect_and_disconnect() {
    let mut hub = SessionHub::new();
    let (conn, _rx) = client(8);

    let handle = hub.connect(conn);
    assert_eq!(hub.len(), 1);
    assert!(hub.contains(&handle));

    assert!(hub.disconnect(&handle));
    assert!(hub.is_empty());
}

#[test]
fn test_disconnect_is_idempotent() {
    let mut hub = SessionHub::new();
    let (conn, _rx) = client(8);
    let handle = hub.connect(conn);

    assert!(hub.disconnect(&handle));
    assert!(!hub.disconnect(&handle));
    assert!(hub.is_empty());
}

#[test]
fn test_session_info() {
    let mut hub = SessionHub::new();
    let (conn, _rx) = client(8);
    let conn = conn.with_peer("127.0.0.1:40000".parse().unwrap());
    let handle = hub.connect(conn);

    let info = hub.info(&handle).expect("session should exist");
    assert_eq!(info.id, handle.id());
    assert_eq!(info.peer, Some("127.0.0.1:40000".parse().unwrap()));
    assert!(info.alive);
    assert_eq!(hub.session_ids(), vec![handle.id()]);
}

#[test]
fn test_on_client_message_forwards_verbatim() {
    let mut hub = SessionHub::new();
    let (conn, _rx) = client(8);
    let handle = hub.connect(conn);
    let sink = RecordingSink::default();

    for text in ["mode rock", "tempo +", "  volume 8 ", "not a real command"] {
        hub.on_client_message(&handle, Command::new(text), &sink);
    }

    let sent: Vec<String> = sink
        .commands
        .borrow()
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();
    assert_eq!(
        sent,
        vec!["mode rock", "tempo +", "  volume 8 ", "not a real command"]
    );
}

#[test]
fn test_broadcast_reaches_every_session() {
    let mut hub = SessionHub::new();
    let (a, mut rx_a) = client(8);
    let (b, mut rx_b) = client(8);
    hub.connect(a);
    hub.connect(b);

    let delivered = hub.broadcast(&StatusMessage::new("tempo=125, mode=1, volume=8"));
    assert_eq!(delivered, 2);

    assert_eq!(
        status_text(rx_a.try_recv().unwrap()),
        "tempo=125, mode=1, volume=8"
    );
    assert_eq!(
        status_text(rx_b.try_recv().unwrap()),
        "tempo=125, mode=1, volume=8"
    );
}

#[test]
fn test_broadcast_skips_closed_session() {
    let mut hub = SessionHub::new();
    let (a, mut rx_a) = client(8);
    let (b, rx_b) = client(8);
    let (c, mut rx_c) = client(8);
    hub.connect(a);
    let dead = hub.connect(b);
    hub.connect(c);

    drop(rx_b);

    let delivered = hub.broadcast(&StatusMessage::new("mode=2"));
    assert_eq!(delivered, 2);
    assert!(rx_a.try_recv().is_ok());
    assert!(rx_c.try_recv().is_ok());

    // Still registered until its disconnect arrives, but no longer alive
    let info = hub.info(&dead).unwrap();
    assert!(!info.alive);
    assert_eq!(hub.broadcast(&StatusMessage::new("mode=0")), 2);
}

#[test]
fn test_broadcast_skips_full_session_without_blocking() {
    let mut hub = SessionHub::new();
    let (slow, mut rx_slow) = client(1);
    let (fast, mut rx_fast) = client(8);
    let slow_handle = hub.connect(slow);
    hub.connect(fast);

    assert_eq!(hub.broadcast(&StatusMessage::new("tempo=100")), 2);
    assert_eq!(hub.broadcast(&StatusMessage::new("tempo=101")), 1);

    assert_eq!(status_text(rx_slow.try_recv().unwrap()), "tempo=100");
    assert!(rx_slow.try_recv().is_err());
    assert_eq!(status_text(rx_fast.try_recv().unwrap()), "tempo=100");
    assert_eq!(status_text(rx_fast.try_recv().unwrap()), "tempo=101");

    // A full queue is not a dead client
    assert!(hub.info(&slow_handle).unwrap().alive);
    assert_eq!(hub.broadcast(&StatusMessage::new("tempo=102")), 2);
}

#[test]
fn test_late_joiner_gets_no_earlier_broadcast() {
    let mut hub = SessionHub::new();
    let (a, _rx_a) = client(8);
    hub.connect(a);
    hub.broadcast(&StatusMessage::new("tempo=90"));

    let (late, mut rx_late) = client(8);
    hub.connect(late);
    assert!(rx_late.try_recv().is_err());

    hub.broadcast(&StatusMessage::new("tempo=91"));
    assert_eq!(status_text(rx_late.try_recv().unwrap()), "tempo=91");
}

#[test]
fn test_broadcast_with_no_sessions() {
    let mut hub = SessionHub::new();
    assert_eq!(hub.broadcast(&StatusMessage::new("tempo=90")), 0);
}
