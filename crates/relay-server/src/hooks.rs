//! Host hooks for the relay binary.
//!
//! The binary's hook set gates handshake origins from configuration and
//! logs lifecycle events; embedders of relay-core supply their own.

use async_trait::async_trait;
use relay_core::{Connection, ConnectionId, Hooks};
use tracing::info;

/// Hooks driven by the server configuration.
pub struct ServerHooks {
    allowed_origins: Option<Vec<String>>,
}

impl ServerHooks {
    /// Create hooks with an optional origin allowlist.
    ///
    /// `None` or an empty list allows every origin.
    #[must_use]
    pub fn new(allowed_origins: Option<Vec<String>>) -> Self {
        Self { allowed_origins }
    }
}

#[async_trait]
impl Hooks for ServerHooks {
    fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        match &self.allowed_origins {
            None => true,
            Some(list) if list.is_empty() => true,
            Some(list) => origin.is_some_and(|o| list.iter().any(|allowed| allowed == o)),
        }
    }

    async fn on_server_start(&self) {
        info!("Relay accepting connections");
    }

    async fn on_server_stop(&self) {
        info!("Relay shutting down");
    }

    async fn on_client_connect(&self, connection: &Connection) {
        info!(connection = %connection.id(), "Client connected");
    }

    async fn on_client_disconnect(&self, id: &ConnectionId) {
        info!(connection = %id, "Client disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_allowlist_admits_everyone() {
        let hooks = ServerHooks::new(None);
        assert!(hooks.is_origin_allowed(None));
        assert!(hooks.is_origin_allowed(Some("https://anywhere.example")));

        let hooks = ServerHooks::new(Some(vec![]));
        assert!(hooks.is_origin_allowed(Some("https://anywhere.example")));
    }

    #[test]
    fn test_allowlist_gates_origin() {
        let hooks = ServerHooks::new(Some(vec!["https://app.example".to_string()]));
        assert!(hooks.is_origin_allowed(Some("https://app.example")));
        assert!(!hooks.is_origin_allowed(Some("https://evil.example")));
        // A missing origin header fails a configured allowlist
        assert!(!hooks.is_origin_allowed(None));
    }
}
