//! Message router for relay.
//!
//! The router owns the connection registry and topic table behind a single
//! lock, republishes inbound traffic on the event bus, and exposes the
//! unicast/broadcast/topic fan-out primitives to the host process.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use relay_protocol::{codec, InboundKind, OutboundEnvelope};

use crate::bus::{EventBus, EventStream};
use crate::connection::{Connection, ConnectionId, OutboundReceiver};
use crate::hooks::{Hooks, NoopHooks};
use crate::id::{IdGenerator, DEFAULT_ID_LENGTH};
use crate::registry::{Registry, RegistryError};
use crate::topics::TopicTable;

/// Router errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Identifier collision survived every regeneration attempt.
    #[error("duplicate connection identifier after {0} attempts")]
    DuplicateIdentifier(usize),
}

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Length of generated connection identifiers.
    pub id_length: usize,
    /// Identifier regeneration attempts before acceptance fails.
    pub register_attempts: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            id_length: DEFAULT_ID_LENGTH,
            register_attempts: 4,
        }
    }
}

/// Registry and topic table, mutated as one unit.
///
/// Both halves share one lock so a connection's close-driven cleanup can
/// never race an in-flight fan-out to that same connection.
#[derive(Debug, Default)]
struct RouterState {
    registry: Registry,
    topics: TopicTable,
}

impl RouterState {
    /// Remove a connection and every topic entry pointing at it.
    ///
    /// This is the one correctness-critical cross-component call: registry
    /// removal must cascade to the topic table.
    fn evict(&mut self, id: &ConnectionId) -> Option<Connection> {
        let connection = self.registry.remove(id)?;
        let dropped = self.topics.remove_connection(id);
        if dropped > 0 {
            debug!(connection = %id, subscriptions = dropped, "Dropped topic subscriptions on close");
        }
        Some(connection)
    }
}

/// The central message router.
pub struct Router {
    state: Mutex<RouterState>,
    bus: EventBus<Value>,
    ids: IdGenerator,
    hooks: Arc<dyn Hooks>,
    config: RouterConfig,
}

impl Router {
    /// Create a router with default configuration and no-op hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create a router with custom configuration and no-op hooks.
    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self::with_hooks(config, Arc::new(NoopHooks))
    }

    /// Create a router with custom configuration and host hooks.
    #[must_use]
    pub fn with_hooks(config: RouterConfig, hooks: Arc<dyn Hooks>) -> Self {
        info!(id_length = config.id_length, "Creating router");
        Self {
            state: Mutex::new(RouterState::default()),
            bus: EventBus::new(),
            ids: IdGenerator::new(config.id_length),
            hooks,
            config,
        }
    }

    /// The host hooks this router was built with.
    #[must_use]
    pub fn hooks(&self) -> Arc<dyn Hooks> {
        Arc::clone(&self.hooks)
    }

    fn state(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().expect("router state lock poisoned")
    }

    /// Accept a newly established connection.
    ///
    /// Generates an identifier (regenerating on the off chance of a
    /// collision), registers the connection, and invokes the host's
    /// connect hook. Returns the connection handle and the outbound
    /// receiver the transport pump must drain.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::DuplicateIdentifier`] if every regeneration
    /// attempt collided, which should never occur in practice.
    pub async fn accept_connection(&self) -> Result<(Connection, OutboundReceiver), RouterError> {
        let (connection, rx) = {
            let mut state = self.state();
            let mut attempt = 0;
            loop {
                attempt += 1;
                let id = ConnectionId::new(self.ids.generate());
                let (connection, rx) = Connection::channel(id);
                match state.registry.register(connection.clone()) {
                    Ok(()) => break (connection, rx),
                    Err(RegistryError::DuplicateIdentifier(id))
                        if attempt < self.config.register_attempts =>
                    {
                        warn!(connection = %id, attempt, "Identifier collision, regenerating");
                    }
                    Err(RegistryError::DuplicateIdentifier(_)) => {
                        return Err(RouterError::DuplicateIdentifier(attempt));
                    }
                }
            }
        };

        debug!(connection = %connection.id(), "Connection accepted");
        self.hooks.on_client_connect(&connection).await;
        Ok((connection, rx))
    }

    /// Handle the close of a connection.
    ///
    /// Evicts it from the registry, cascades topic cleanup, and invokes the
    /// host's disconnect hook. Idempotent.
    pub async fn disconnect(&self, id: &ConnectionId) {
        let evicted = self.state().evict(id);
        if evicted.is_some() {
            debug!(connection = %id, "Connection closed");
            self.hooks.on_client_disconnect(id).await;
        }
    }

    /// Handle one inbound frame from a connection.
    ///
    /// Malformed frames are logged and dropped; the connection stays open.
    /// Every successfully decoded frame is republished on the event bus
    /// under a channel named by its kind, then subscribe/unsubscribe mutate
    /// the topic table and everything else goes to the host's send hook.
    pub async fn handle_frame(&self, connection: &Connection, text: &str) {
        let envelope = match codec::decode_inbound(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(connection = %connection.id(), error = %error, "Dropping malformed frame");
                return;
            }
        };

        // Raw-traffic channel, observable irrespective of dispatch below.
        self.bus.publish(
            envelope.kind.as_str(),
            serde_json::json!({
                "source": connection.id().as_str(),
                "payload": envelope.message.clone(),
            }),
        );

        match &envelope.kind {
            InboundKind::Subscribe => match envelope.topic() {
                Some(topic) => {
                    self.subscribe_topic(&topic, connection.id());
                }
                None => {
                    warn!(connection = %connection.id(), "Subscribe without topic payload");
                }
            },
            InboundKind::Unsubscribe => match envelope.topic() {
                Some(topic) => {
                    self.unsubscribe_topic(&topic, connection.id());
                }
                None => {
                    warn!(connection = %connection.id(), "Unsubscribe without topic payload");
                }
            },
            InboundKind::Other(kind) => {
                trace!(connection = %connection.id(), kind = %kind, "Forwarding frame to host");
                self.hooks.on_client_send(&envelope, connection).await;
            }
        }
    }

    /// Send an envelope to one connection.
    ///
    /// A silent no-op if the target is absent. Returns the event bus stream
    /// for `event` so the caller can observe future activity on that name.
    pub fn unicast(
        &self,
        target: &ConnectionId,
        event: impl Into<String>,
        data: Value,
    ) -> EventStream<Value> {
        let event = event.into();
        {
            let state = self.state();
            match state.registry.get(target) {
                Some(connection) => {
                    connection.send(OutboundEnvelope::new(event.clone(), data));
                }
                None => trace!(connection = %target, "Unicast to absent connection"),
            }
        }
        self.bus.subscribe(&event)
    }

    /// Send an envelope to every registered connection.
    pub fn broadcast_all(&self, event: impl Into<String>, data: Value) -> EventStream<Value> {
        self.fan_out(None, event.into(), data)
    }

    /// Send an envelope to every registered connection except one.
    pub fn broadcast_except(
        &self,
        omit: &ConnectionId,
        event: impl Into<String>,
        data: Value,
    ) -> EventStream<Value> {
        self.fan_out(Some(omit), event.into(), data)
    }

    fn fan_out(
        &self,
        omit: Option<&ConnectionId>,
        event: String,
        data: Value,
    ) -> EventStream<Value> {
        {
            let state = self.state();
            let mut delivered = 0;
            for connection in state.registry.iter() {
                if omit == Some(connection.id()) {
                    continue;
                }
                if connection.send(OutboundEnvelope::new(event.clone(), data.clone())) {
                    delivered += 1;
                }
            }
            trace!(event = %event, recipients = delivered, "Broadcast");
        }
        self.bus.subscribe(&event)
    }

    /// Send a per-recipient computed envelope to every connection except an
    /// optionally omitted one.
    ///
    /// The closure runs against a consistent snapshot of the registry taken
    /// at call time and may not call back into the router. Returns the
    /// number of connections the envelope was handed to.
    pub fn broadcast_with<F>(&self, payload: F, omit: Option<&ConnectionId>) -> usize
    where
        F: Fn(&ConnectionId) -> OutboundEnvelope,
    {
        let targets: Vec<Connection> = {
            let state = self.state();
            state
                .registry
                .iter()
                .filter(|connection| omit != Some(connection.id()))
                .cloned()
                .collect()
        };

        let mut delivered = 0;
        for connection in &targets {
            if connection.send(payload(connection.id())) {
                delivered += 1;
            }
        }
        trace!(recipients = delivered, "Broadcast with computed payloads");
        delivered
    }

    /// Publish to every connection subscribed to a topic.
    ///
    /// Subscribers no longer present in the registry are silently skipped.
    /// The value is also recorded on the event bus; the returned stream
    /// observes that channel (starting with this value).
    pub fn publish_topic(&self, event: &str, data: Value) -> EventStream<Value> {
        {
            let state = self.state();
            let mut delivered = 0;
            let mut skipped = 0;
            for id in state.topics.subscribers(event) {
                match state.registry.get(id) {
                    Some(connection) => {
                        if connection.send(OutboundEnvelope::new(event, data.clone())) {
                            delivered += 1;
                        } else {
                            skipped += 1;
                        }
                    }
                    // Disconnected but not yet purged; never a failure.
                    None => skipped += 1,
                }
            }
            trace!(topic = %event, recipients = delivered, skipped, "Published to topic");
        }
        self.bus.publish(event, data)
    }

    /// Subscribe a connection to a topic (host-driven equivalent of the
    /// inbound subscribe frame). Duplicate subscriptions are no-ops.
    pub fn subscribe_topic(&self, topic: &str, id: &ConnectionId) -> bool {
        self.state().topics.subscribe(topic, id)
    }

    /// Unsubscribe a connection from a topic (host-driven equivalent of the
    /// inbound unsubscribe frame). A no-op if not subscribed.
    pub fn unsubscribe_topic(&self, topic: &str, id: &ConnectionId) -> bool {
        self.state().topics.unsubscribe(topic, id)
    }

    /// Snapshot of all registered connection identifiers.
    #[must_use]
    pub fn list_connections(&self) -> Vec<ConnectionId> {
        self.state().registry.ids()
    }

    /// Observe a named event bus channel.
    #[must_use]
    pub fn observe(&self, event: &str) -> EventStream<Value> {
        self.bus.subscribe(event)
    }

    /// Get router statistics.
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        let state = self.state();
        RouterStats {
            connections: state.registry.len(),
            topics: state.topics.topic_count(),
            subscriptions: state.topics.subscription_count(),
            bus_channels: self.bus.channel_count(),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Router statistics.
#[derive(Debug, Clone)]
pub struct RouterStats {
    /// Number of registered connections.
    pub connections: usize,
    /// Number of topics with at least one subscriber.
    pub topics: usize,
    /// Total topic subscriptions.
    pub subscriptions: usize,
    /// Number of event bus channels created so far.
    pub bus_channels: usize,
}
