//! Connection handles.
//!
//! A [`Connection`] is a cheap, cloneable handle to one live bidirectional
//! session. The transport pump task owns the socket and the matching
//! [`OutboundReceiver`]; everything else addresses the connection through
//! this handle.

use relay_protocol::OutboundEnvelope;
use std::fmt;
use tokio::sync::mpsc;
use tracing::trace;

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new connection ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Receiver half of a connection's outbound queue, owned by the pump task.
pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundEnvelope>;

/// Handle to one live connection.
///
/// Sending never blocks; envelopes are queued for the pump task that owns
/// the socket. Delivery is best-effort: a send toward a closed pump is a
/// silent no-op.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<OutboundEnvelope>,
}

impl Connection {
    /// Create a connection handle and the outbound receiver for its pump.
    #[must_use]
    pub fn channel(id: ConnectionId) -> (Self, OutboundReceiver) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { id, outbound }, rx)
    }

    /// Get the connection's unique identifier.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Queue an envelope for delivery.
    ///
    /// Returns `false` if the pump is gone (connection closing); the
    /// envelope is dropped.
    pub fn send(&self, envelope: OutboundEnvelope) -> bool {
        match self.outbound.send(envelope) {
            Ok(()) => true,
            Err(_) => {
                trace!(connection = %self.id, "Dropped envelope for closed connection");
                false
            }
        }
    }

    /// Check if the pump side of the connection is still alive.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}
