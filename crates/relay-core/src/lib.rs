//! # relay-core
//!
//! Connection registry, topic subscriptions, replay-1 event bus, and
//! message routing for the relay realtime router.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Connection** - cloneable handle to one live bidirectional session
//! - **Registry** - the set of live connections keyed by identifier
//! - **TopicTable** - named topics and their subscriber lists
//! - **EventBus** - keyed replay-1 multicast for cross-component observation
//! - **Router** - ties inbound frames to these structures and exposes the
//!   unicast/broadcast/topic fan-out API
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connection │────▶│   Router    │────▶│  TopicTable │
//! └─────────────┘     └──────┬──────┘     └─────────────┘
//!                            │
//!                     ┌──────┴──────┐     ┌─────────────┐
//!                     │  Registry   │     │  EventBus   │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! The registry and topic table are mutated under a single lock, so every
//! lifecycle and fan-out operation observes one total order; the event bus
//! is independently concurrency-safe.

pub mod bus;
pub mod connection;
pub mod hooks;
pub mod id;
pub mod registry;
pub mod router;
pub mod topics;

pub use bus::{EventBus, EventStream};
pub use connection::{Connection, ConnectionId, OutboundReceiver};
pub use hooks::{Hooks, NoopHooks};
pub use id::IdGenerator;
pub use registry::{Registry, RegistryError};
pub use router::{Router, RouterConfig, RouterError, RouterStats};
pub use topics::TopicTable;
