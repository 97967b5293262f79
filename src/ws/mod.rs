//! WebSocket transport
//!
//! Reconnecting client with ping/pong keepalive. Connection loss surfaces as
//! `Reconnecting` followed by a fresh `Connected`.

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsMessage, MIN_PING_INTERVAL};
