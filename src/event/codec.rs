//! Wire codec for distributed event delivery.
//!
//! Events travel as a flat JSON object: one field per event attribute plus
//! a discriminator field carrying the original event type name. Timestamps
//! serialize as ISO-8601 text, so producers and consumers written against
//! the same event set round-trip every field exactly.

use std::fmt;

use serde_json::Value as JsonValue;

use super::events::DomainEvent;
use super::registry::EventTypeRegistry;

/// Discriminator field recording the original event type name.
pub const TYPE_FIELD: &str = "event_type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Payload is not valid JSON, not an object, or its fields do not
    /// match the target event shape.
    Malformed(String),
    /// The discriminator names an event type not registered locally.
    UnknownEventType(String),
    /// The payload has no discriminator field.
    MissingDiscriminator,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Malformed(msg) => write!(f, "malformed event payload: {}", msg),
            CodecError::UnknownEventType(name) => {
                write!(f, "unknown event type: {}", name)
            }
            CodecError::MissingDiscriminator => {
                write!(f, "event payload has no '{}' field", TYPE_FIELD)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Flatten an event into its wire bytes.
pub fn encode(event: &DomainEvent) -> Result<Vec<u8>, CodecError> {
    let mut value = match event {
        DomainEvent::RecordIngested(e) => serde_json::to_value(e),
        DomainEvent::RecordValidated(e) => serde_json::to_value(e),
        DomainEvent::RecordProcessed(e) => serde_json::to_value(e),
    }
    .map_err(|e| CodecError::Malformed(e.to_string()))?;

    let fields = value
        .as_object_mut()
        .ok_or_else(|| CodecError::Malformed("event did not serialize to an object".into()))?;
    fields.insert(
        TYPE_FIELD.to_string(),
        JsonValue::String(event.event_type().to_string()),
    );

    serde_json::to_vec(&value).map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Reconstruct an event from its wire bytes using locally registered
/// descriptors.
pub fn decode(bytes: &[u8], registry: &EventTypeRegistry) -> Result<DomainEvent, CodecError> {
    let mut value: JsonValue =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;

    let fields = value
        .as_object_mut()
        .ok_or_else(|| CodecError::Malformed("payload is not a JSON object".into()))?;

    let event_type = match fields.remove(TYPE_FIELD) {
        Some(JsonValue::String(name)) => name,
        Some(_) => return Err(CodecError::Malformed("discriminator is not a string".into())),
        None => return Err(CodecError::MissingDiscriminator),
    };

    registry.decode_value(&event_type, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::events::{RecordIngested, RecordValidated};
    use chrono::Utc;

    fn full_registry() -> EventTypeRegistry {
        let mut registry = EventTypeRegistry::new();
        registry.register(RecordIngested::descriptor());
        registry.register(RecordValidated::descriptor());
        registry
    }

    #[test]
    fn round_trip_preserves_fields_and_timestamps() {
        let original = RecordIngested::new("r1", "p1", Utc::now());
        let event = DomainEvent::RecordIngested(original.clone());

        let bytes = encode(&event).unwrap();
        let decoded = decode(&bytes, &full_registry()).unwrap();

        assert_eq!(decoded, DomainEvent::RecordIngested(original));
    }

    #[test]
    fn wire_format_is_flat_with_discriminator() {
        let event = DomainEvent::RecordValidated(RecordValidated::new(
            "r1",
            "p1",
            false,
            vec!["age must be between 0 and 120".into()],
        ));

        let bytes = encode(&event).unwrap();
        let value: JsonValue = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value[TYPE_FIELD], "RecordValidated");
        assert_eq!(value["record_id"], "r1");
        assert_eq!(value["is_valid"], false);
        // occurred_at is ISO-8601 text on the wire
        assert!(value["occurred_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn unknown_discriminator_is_a_hard_error() {
        let bytes = br#"{"event_type":"OrderShipped","order_id":"o1"}"#;
        let err = decode(bytes, &full_registry()).unwrap_err();
        assert_eq!(err, CodecError::UnknownEventType("OrderShipped".into()));
    }

    #[test]
    fn missing_discriminator_is_rejected() {
        let err = decode(br#"{"record_id":"r1"}"#, &full_registry()).unwrap_err();
        assert_eq!(err, CodecError::MissingDiscriminator);
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let err = decode(b"not json", &full_registry()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn field_mismatch_is_malformed() {
        // Right discriminator, wrong shape.
        let bytes = br#"{"event_type":"RecordIngested","record_id":42}"#;
        let err = decode(bytes, &full_registry()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }
}
