//! Connection registry.
//!
//! Owns the set of live connections keyed by identifier. The registry is a
//! plain map mutated through `&mut`; the router composes it with the topic
//! table under a single lock so both halves share one total order of
//! mutations.

use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::connection::{Connection, ConnectionId};

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An identifier collided with a live connection.
    #[error("duplicate connection identifier: {0}")]
    DuplicateIdentifier(ConnectionId),
}

/// Mapping from identifier to live connection.
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, Connection>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Check whether an identifier is registered.
    #[must_use]
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Register a connection under its identifier.
    ///
    /// An identifier present in the registry refers to exactly one live
    /// connection; a collision is rejected, never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateIdentifier`] if the id is taken.
    pub fn register(&mut self, connection: Connection) -> Result<(), RegistryError> {
        let id = connection.id().clone();
        if self.connections.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentifier(id));
        }
        debug!(connection = %id, "Connection registered");
        self.connections.insert(id, connection);
        Ok(())
    }

    /// Remove a connection, returning it if it was present.
    ///
    /// Idempotent: removing an absent identifier is a no-op.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(id);
        if removed.is_some() {
            debug!(connection = %id, "Connection removed");
        }
        removed
    }

    /// Look up a connection by identifier.
    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Snapshot of all registered identifiers.
    ///
    /// Safe to mutate the registry while iterating the snapshot.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().cloned().collect()
    }

    /// Iterate over the registered connections.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(id: &str) -> Connection {
        Connection::channel(ConnectionId::new(id)).0
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = Registry::new();
        registry.register(connection("a")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&ConnectionId::new("a")));
        assert!(registry.get(&ConnectionId::new("a")).is_some());
        assert!(registry.get(&ConnectionId::new("b")).is_none());
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let mut registry = Registry::new();
        registry.register(connection("a")).unwrap();

        assert!(matches!(
            registry.register(connection("a")),
            Err(RegistryError::DuplicateIdentifier(_))
        ));
        // Original connection untouched
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = Registry::new();
        registry.register(connection("a")).unwrap();

        assert!(registry.remove(&ConnectionId::new("a")).is_some());
        assert!(registry.remove(&ConnectionId::new("a")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_snapshot_survives_mutation() {
        let mut registry = Registry::new();
        registry.register(connection("a")).unwrap();
        registry.register(connection("b")).unwrap();

        let snapshot = registry.ids();
        assert_eq!(snapshot.len(), 2);
        for id in &snapshot {
            registry.remove(id);
        }
        assert!(registry.is_empty());
    }
}
