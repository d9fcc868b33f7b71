//! Host hook capabilities.
//!
//! The router takes its host integration points as one capability trait
//! supplied at construction; every method defaults to a no-op so hosts
//! implement only what they need.

use async_trait::async_trait;
use relay_protocol::InboundEnvelope;

use crate::connection::{Connection, ConnectionId};

/// Host-supplied lifecycle and dispatch hooks.
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Gate an incoming handshake by its `Origin` header.
    ///
    /// Returning `false` rejects the handshake before any connection state
    /// is created.
    fn is_origin_allowed(&self, _origin: Option<&str>) -> bool {
        true
    }

    /// Called when the server starts accepting connections.
    async fn on_server_start(&self) {}

    /// Called when the server stops.
    async fn on_server_stop(&self) {}

    /// Called after a connection is registered.
    async fn on_client_connect(&self, _connection: &Connection) {}

    /// Called after a connection is evicted from the registry.
    async fn on_client_disconnect(&self, _id: &ConnectionId) {}

    /// Called with every inbound envelope the router does not dispatch
    /// itself (everything that is not subscribe/unsubscribe).
    async fn on_client_send(&self, _envelope: &InboundEnvelope, _connection: &Connection) {}
}

/// The default no-op hook set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_hooks_allow_everything() {
        let hooks = NoopHooks;
        assert!(hooks.is_origin_allowed(None));
        assert!(hooks.is_origin_allowed(Some("https://example.com")));
        hooks.on_server_start().await;
        hooks.on_server_stop().await;
    }
}
