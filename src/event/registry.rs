//! Registry mapping event type discriminators to typed decoders.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value as JsonValue;

use super::codec::CodecError;
use super::events::DomainEvent;

/// Decoder from a discriminator-stripped JSON object to a typed event.
pub type DecodeFn = fn(JsonValue) -> Result<DomainEvent, CodecError>;

/// Binds a stable event type name to its decoder.
///
/// Descriptors are produced by the event types themselves (for example
/// `RecordIngested::descriptor()`), so the name/decoder pairing is checked
/// at registration time rather than reconstructed by introspection.
#[derive(Clone, Copy)]
pub struct EventDescriptor {
    event_type: &'static str,
    decode: DecodeFn,
}

impl EventDescriptor {
    pub fn new(event_type: &'static str, decode: DecodeFn) -> Self {
        Self { event_type, decode }
    }

    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    pub fn decode(&self, value: JsonValue) -> Result<DomainEvent, CodecError> {
        (self.decode)(value)
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("event_type", &self.event_type)
            .finish()
    }
}

/// Event type registry owned by a bus instance.
///
/// A receiving process can only reconstruct event types whose descriptors
/// were registered locally; an unregistered discriminator decodes to
/// [`CodecError::UnknownEventType`], never to a silently dropped message.
#[derive(Debug, Default)]
pub struct EventTypeRegistry {
    decoders: HashMap<&'static str, EventDescriptor>,
}

impl EventTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Registering the same event type again is a
    /// no-op (descriptors come from the closed event set, one per name).
    pub fn register(&mut self, descriptor: EventDescriptor) {
        self.decoders.entry(descriptor.event_type()).or_insert(descriptor);
    }

    pub fn is_registered(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Decode a discriminator-stripped JSON object as `event_type`.
    pub fn decode_value(
        &self,
        event_type: &str,
        value: JsonValue,
    ) -> Result<DomainEvent, CodecError> {
        let descriptor = self
            .decoders
            .get(event_type)
            .ok_or_else(|| CodecError::UnknownEventType(event_type.to_string()))?;
        descriptor.decode(value)
    }
}
