//! Error taxonomy for the arena server.
//!
//! None of these are fatal: store errors become ignored messages, protocol
//! errors drop one inbound frame, transport errors affect one recipient.

use crate::world::PlayerId;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures reported by the world store. A failed operation leaves the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("connection {0} already has a player")]
    DuplicateConnection(PlayerId),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unsupported frame type")]
    UnsupportedFrame,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::MalformedMessage(err.to_string())
    }
}

/// Anything the router can refuse a message for.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Settings the server refuses to start with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("arena must have a positive finite size, got {width}x{height}")]
    InvalidArena { width: f32, height: f32 },

    #[error("{0} must be at least 1")]
    Zero(&'static str),

    #[error("winning level {0} must be above the starting level")]
    WinLevelTooLow(u32),
}

/// Delivery failure towards a single connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("outbound queue for {0} is full")]
    QueueFull(PlayerId),

    #[error("connection {0} is closed")]
    Closed(PlayerId),

    #[error("write timed out")]
    Timeout,

    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
