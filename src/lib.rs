//! beatbridge - relay between WebSocket clients and a UDP beatbox backend
//!
//! This crate provides the core functionality for beatbridge, including:
//! - Session tracking and status broadcast for connected clients
//! - The UDP channel to the backend process and auto-poll pacing
//! - Client-facing protocol
//! - Configuration management
//!
//! # Architecture
//!
//! Clients connect over WebSocket and send `command` events. Each command is
//! sent verbatim as one datagram to the backend. Every datagram the backend
//! sends back is broadcast to all connected clients as a `status_update`.
//! A single reactor task owns the session set and the backend socket.

pub mod backend;
pub mod config;
pub mod protocol;
pub mod server;
