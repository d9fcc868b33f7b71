//! Transport abstraction traits.
//!
//! These traits define the boundary between the router core and the
//! underlying wire protocol: a [`Listener`] accepts handshakes (applying
//! origin gating before any connection state exists) and yields
//! [`Socket`]s carrying whole text frames.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Handshake denied by the origin policy. No connection was created.
    #[error("handshake rejected: origin not allowed")]
    OriginRejected,

    /// Failed to send data.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Handshake origin gate, evaluated before a socket is handed out.
pub type OriginPolicy = Arc<dyn Fn(Option<&str>) -> bool + Send + Sync>;

/// A listener that accepts message-oriented connections.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Accept the next connection.
    ///
    /// Blocks until a handshake completes or fails. A handshake denied by
    /// the origin policy surfaces as [`TransportError::OriginRejected`];
    /// the caller should log and keep accepting.
    async fn accept(&self) -> Result<Box<dyn Socket>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// One accepted bidirectional, message-oriented session.
///
/// Sockets deal in whole text frames; framing and keepalive are handled
/// below this interface.
#[async_trait]
pub trait Socket: Send {
    /// Receive the next text frame.
    ///
    /// Returns `None` if the connection closed cleanly.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Send a text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// The `Origin` header presented during the handshake, if any.
    fn origin(&self) -> Option<&str>;

    /// The remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }
}
