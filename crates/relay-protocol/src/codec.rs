//! Codec for the relay wire protocol.
//!
//! The wire format is textual JSON carried in WebSocket text messages, so
//! no length-prefix framing is needed; the transport delimits frames.

use thiserror::Error;

use crate::envelope::{InboundEnvelope, OutboundEnvelope};

/// Maximum accepted frame size (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// Undecodable inbound payload.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Outbound envelope could not be serialized.
    #[error("encoding error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode an inbound envelope from wire text.
///
/// # Errors
///
/// Returns an error if the frame is too large or is not a valid envelope.
pub fn decode_inbound(text: &str) -> Result<InboundEnvelope, ProtocolError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(text.len()));
    }
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

/// Encode an outbound envelope to wire text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_outbound(envelope: &OutboundEnvelope) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(ProtocolError::Encode)
}

/// Encode an inbound envelope to wire text.
///
/// Used by clients and tests; the server only decodes inbound envelopes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_inbound(envelope: &InboundEnvelope) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(ProtocolError::Encode)
}

/// Decode an outbound envelope from wire text.
///
/// Used by clients and tests; the server only encodes outbound envelopes.
///
/// # Errors
///
/// Returns an error if the text is not a valid envelope.
pub fn decode_outbound(text: &str) -> Result<OutboundEnvelope, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::InboundKind;
    use serde_json::json;

    #[test]
    fn test_decode_subscribe() {
        let envelope =
            decode_inbound(r#"{"type":"subscribe","message":{"event":"rooms"}}"#).unwrap();
        assert_eq!(envelope.kind, InboundKind::Subscribe);
        assert_eq!(envelope.topic(), Some("rooms".to_string()));
    }

    #[test]
    fn test_decode_unknown_kind_is_other() {
        let envelope = decode_inbound(r#"{"type":"server","message":[1,2,3]}"#).unwrap();
        assert_eq!(envelope.kind, InboundKind::Other("server".to_string()));
        assert_eq!(envelope.message, json!([1, 2, 3]));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode_inbound("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        // An object without a type field is not an envelope
        assert!(matches!(
            decode_inbound(r#"{"message":"hi"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_oversized() {
        let text = format!(
            r#"{{"type":"chat","message":"{}"}}"#,
            "x".repeat(MAX_FRAME_SIZE)
        );
        assert!(matches!(
            decode_inbound(&text),
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn test_outbound_wire_shape() {
        let envelope = OutboundEnvelope::new("rooms", json!({"x": 1}));
        let text = encode_outbound(&envelope).unwrap();
        assert_eq!(text, r#"{"event":"rooms","data":{"x":1}}"#);

        let decoded = decode_outbound(&text).unwrap();
        assert_eq!(decoded, envelope);
    }
}
