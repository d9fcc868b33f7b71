//! # relay-protocol
//!
//! Wire envelope definitions for the relay realtime router.
//!
//! The protocol is textual JSON over a message-oriented transport. Two
//! envelope shapes exist:
//!
//! - **Inbound** - `{"type": ..., "message": ..., "to": ...}`, classified
//!   into a closed tagged union ([`InboundKind`]) at the boundary.
//! - **Outbound** - `{"event": ..., "data": ...}`, pushed to connections by
//!   unicast, broadcast, and topic fan-out.

pub mod codec;
pub mod envelope;

pub use codec::ProtocolError;
pub use envelope::{InboundEnvelope, InboundKind, OutboundEnvelope, SubscribePayload};
