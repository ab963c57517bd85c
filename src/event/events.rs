//! Concrete domain event types for the ingestion choreography.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::codec::CodecError;
use super::registry::EventDescriptor;

/// Fact: a partner-submitted record was accepted and stored.
///
/// Published by the ingestion service; consumed independently by the
/// validation, processing, and query services.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordIngested {
    pub event_id: String,
    pub occurred_at: DateTime<Utc>,
    pub record_id: String,
    pub partner_id: String,
    pub ingested_at: DateTime<Utc>,
}

impl RecordIngested {
    pub const EVENT_TYPE: &'static str = "RecordIngested";

    pub fn new(
        record_id: impl Into<String>,
        partner_id: impl Into<String>,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            record_id: record_id.into(),
            partner_id: partner_id.into(),
            ingested_at,
        }
    }

    pub fn descriptor() -> EventDescriptor {
        EventDescriptor::new(Self::EVENT_TYPE, |value| {
            serde_json::from_value::<RecordIngested>(value)
                .map(DomainEvent::RecordIngested)
                .map_err(|e| CodecError::Malformed(e.to_string()))
        })
    }
}

/// Fact: a stored record was checked against the validation rule set.
///
/// `validation_errors` is ordered as the rules were applied and empty
/// exactly when `is_valid` is true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordValidated {
    pub event_id: String,
    pub occurred_at: DateTime<Utc>,
    pub record_id: String,
    pub partner_id: String,
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
}

impl RecordValidated {
    pub const EVENT_TYPE: &'static str = "RecordValidated";

    pub fn new(
        record_id: impl Into<String>,
        partner_id: impl Into<String>,
        is_valid: bool,
        validation_errors: Vec<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            record_id: record_id.into(),
            partner_id: partner_id.into(),
            is_valid,
            validation_errors,
        }
    }

    pub fn descriptor() -> EventDescriptor {
        EventDescriptor::new(Self::EVENT_TYPE, |value| {
            serde_json::from_value::<RecordValidated>(value)
                .map(DomainEvent::RecordValidated)
                .map_err(|e| CodecError::Malformed(e.to_string()))
        })
    }
}

/// Fact: a stored record was processed and produced a result payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordProcessed {
    pub event_id: String,
    pub occurred_at: DateTime<Utc>,
    pub record_id: String,
    pub partner_id: String,
    pub result: JsonValue,
}

impl RecordProcessed {
    pub const EVENT_TYPE: &'static str = "RecordProcessed";

    pub fn new(
        record_id: impl Into<String>,
        partner_id: impl Into<String>,
        result: JsonValue,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            record_id: record_id.into(),
            partner_id: partner_id.into(),
            result,
        }
    }

    pub fn descriptor() -> EventDescriptor {
        EventDescriptor::new(Self::EVENT_TYPE, |value| {
            serde_json::from_value::<RecordProcessed>(value)
                .map(DomainEvent::RecordProcessed)
                .map_err(|e| CodecError::Malformed(e.to_string()))
        })
    }
}

/// The closed set of domain events carried by the bus.
///
/// Dispatch is keyed on the exact event type name — no supertype matching.
#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    RecordIngested(RecordIngested),
    RecordValidated(RecordValidated),
    RecordProcessed(RecordProcessed),
}

impl DomainEvent {
    /// Stable discriminator used for topic naming and wire encoding.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::RecordIngested(_) => RecordIngested::EVENT_TYPE,
            DomainEvent::RecordValidated(_) => RecordValidated::EVENT_TYPE,
            DomainEvent::RecordProcessed(_) => RecordProcessed::EVENT_TYPE,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            DomainEvent::RecordIngested(e) => &e.event_id,
            DomainEvent::RecordValidated(e) => &e.event_id,
            DomainEvent::RecordProcessed(e) => &e.event_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::RecordIngested(e) => e.occurred_at,
            DomainEvent::RecordValidated(e) => e.occurred_at,
            DomainEvent::RecordProcessed(e) => e.occurred_at,
        }
    }

    /// Look up the descriptor for a known event type name.
    ///
    /// Returns `None` for names outside the closed event set, which the
    /// bus surfaces as a subscribe-time error rather than a silent no-op.
    pub fn descriptor_for(event_type: &str) -> Option<EventDescriptor> {
        match event_type {
            RecordIngested::EVENT_TYPE => Some(RecordIngested::descriptor()),
            RecordValidated::EVENT_TYPE => Some(RecordValidated::descriptor()),
            RecordProcessed::EVENT_TYPE => Some(RecordProcessed::descriptor()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_get_unique_ids() {
        let a = RecordIngested::new("r1", "p1", Utc::now());
        let b = RecordIngested::new("r1", "p1", Utc::now());
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn event_type_matches_variant() {
        let event = DomainEvent::RecordValidated(RecordValidated::new("r1", "p1", true, vec![]));
        assert_eq!(event.event_type(), "RecordValidated");
        assert_eq!(event.event_type(), RecordValidated::EVENT_TYPE);
    }

    #[test]
    fn descriptor_lookup_covers_all_types() {
        for name in ["RecordIngested", "RecordValidated", "RecordProcessed"] {
            let descriptor = DomainEvent::descriptor_for(name).unwrap();
            assert_eq!(descriptor.event_type(), name);
        }
        assert!(DomainEvent::descriptor_for("OrderShipped").is_none());
    }
}
