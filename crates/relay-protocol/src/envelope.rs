//! Envelope types for the relay wire protocol.
//!
//! Envelopes are the structured message wrappers exchanged over a
//! connection, distinct from raw transport framing. Inbound envelopes are
//! classified by a closed tagged union; outbound envelopes pair an event
//! name with an opaque payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound envelope kinds.
///
/// Only `Subscribe` and `Unsubscribe` are dispatched by the router itself.
/// Every unrecognized `type` value is classified as `Other` and forwarded
/// to the host, never silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum InboundKind {
    /// Subscribe the sending connection to a topic.
    Subscribe,
    /// Unsubscribe the sending connection from a topic.
    Unsubscribe,
    /// Any other kind; carried verbatim for the host.
    Other(String),
}

impl InboundKind {
    /// Get the wire representation of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            InboundKind::Subscribe => "subscribe",
            InboundKind::Unsubscribe => "unsubscribe",
            InboundKind::Other(kind) => kind,
        }
    }
}

impl From<String> for InboundKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "subscribe" => InboundKind::Subscribe,
            "unsubscribe" => InboundKind::Unsubscribe,
            _ => InboundKind::Other(s),
        }
    }
}

impl From<&str> for InboundKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<InboundKind> for String {
    fn from(kind: InboundKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for InboundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound envelope received from a connection.
///
/// Wire form: `{"type": <string>, "message": <opaque>, "to": <id, optional>}`.
/// The `to` field is carried for the host's benefit; the router does not
/// dispatch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Envelope kind, from the `type` field.
    #[serde(rename = "type")]
    pub kind: InboundKind,
    /// Opaque payload. Absent on the wire decodes as `null`.
    #[serde(default)]
    pub message: Value,
    /// Optional target identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl InboundEnvelope {
    /// Create a subscribe envelope for a topic.
    #[must_use]
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Self {
            kind: InboundKind::Subscribe,
            message: serde_json::json!({ "event": topic.into() }),
            to: None,
        }
    }

    /// Create an unsubscribe envelope for a topic.
    #[must_use]
    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        Self {
            kind: InboundKind::Unsubscribe,
            message: serde_json::json!({ "event": topic.into() }),
            to: None,
        }
    }

    /// Create an envelope of an arbitrary kind.
    #[must_use]
    pub fn other(kind: impl Into<String>, message: Value) -> Self {
        Self {
            kind: InboundKind::Other(kind.into()),
            message,
            to: None,
        }
    }

    /// Extract the topic name from a subscribe/unsubscribe payload.
    ///
    /// Returns `None` when the payload does not carry `{"event": <string>}`.
    #[must_use]
    pub fn topic(&self) -> Option<String> {
        serde_json::from_value::<SubscribePayload>(self.message.clone())
            .ok()
            .map(|p| p.event)
    }
}

/// Payload of subscribe/unsubscribe envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribePayload {
    /// Topic name to (un)subscribe.
    pub event: String,
}

/// An outbound envelope pushed to a connection.
///
/// Wire form: `{"event": <string>, "data": <opaque>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    /// Event name.
    pub event: String,
    /// Opaque payload.
    pub data: Value,
}

impl OutboundEnvelope {
    /// Create a new outbound envelope.
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_classification() {
        assert_eq!(InboundKind::from("subscribe"), InboundKind::Subscribe);
        assert_eq!(InboundKind::from("unsubscribe"), InboundKind::Unsubscribe);
        assert_eq!(
            InboundKind::from("broadcast"),
            InboundKind::Other("broadcast".to_string())
        );
        assert_eq!(InboundKind::from("broadcast").as_str(), "broadcast");
    }

    #[test]
    fn test_subscribe_topic_extraction() {
        let envelope = InboundEnvelope::subscribe("rooms");
        assert_eq!(envelope.kind, InboundKind::Subscribe);
        assert_eq!(envelope.topic(), Some("rooms".to_string()));
    }

    #[test]
    fn test_topic_extraction_rejects_bad_payload() {
        let envelope = InboundEnvelope::other("subscribe-ish", json!({"name": "rooms"}));
        assert_eq!(envelope.topic(), None);

        let envelope = InboundEnvelope {
            kind: InboundKind::Subscribe,
            message: json!(42),
            to: None,
        };
        assert_eq!(envelope.topic(), None);
    }

    #[test]
    fn test_envelope_missing_message_defaults_to_null() {
        let envelope: InboundEnvelope = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(envelope.kind, InboundKind::Other("ping".to_string()));
        assert_eq!(envelope.message, Value::Null);
        assert!(envelope.to.is_none());
    }

    #[test]
    fn test_envelope_carries_target() {
        let envelope: InboundEnvelope =
            serde_json::from_str(r#"{"type":"chat","message":"hi","to":"abc123"}"#).unwrap();
        assert_eq!(envelope.to.as_deref(), Some("abc123"));
    }
}
