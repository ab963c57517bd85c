//! Validation service - checks ingested records against a fixed rule set.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::bus::{BusError, EventBus, HandlerError};
use crate::event::{DomainEvent, RecordIngested, RecordValidated};
use crate::store::RecordStore;

/// Subscribes to `RecordIngested`, looks the record up, applies the rule
/// set, and publishes one `RecordValidated` per inspected record.
///
/// Runs independently of the processing service: neither knows the other
/// exists. At-least-once delivery may validate a record twice; the rules
/// are pure, so duplicates publish identical results.
pub struct ValidationService {
    store: Arc<dyn RecordStore>,
    bus: Arc<dyn EventBus>,
}

impl ValidationService {
    pub fn new(store: Arc<dyn RecordStore>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// Register this service's subscription on the bus.
    pub fn start(&self) -> Result<(), BusError> {
        let store = Arc::clone(&self.store);
        let bus = Arc::clone(&self.bus);
        self.bus.subscribe(
            RecordIngested::EVENT_TYPE,
            Arc::new(move |event: &DomainEvent| {
                let DomainEvent::RecordIngested(ingested) = event else {
                    return Ok(());
                };
                on_record_ingested(&store, &bus, ingested)
            }),
        )
    }
}

fn on_record_ingested(
    store: &Arc<dyn RecordStore>,
    bus: &Arc<dyn EventBus>,
    ingested: &RecordIngested,
) -> Result<(), HandlerError> {
    let (is_valid, errors) = match store.get_by_id(&ingested.record_id)? {
        Some(record) => validate_payload(&record.payload),
        None => (
            false,
            vec![format!("record {} not found in store", ingested.record_id)],
        ),
    };

    if is_valid {
        tracing::info!(record_id = %ingested.record_id, "record is valid");
    } else {
        tracing::warn!(
            record_id = %ingested.record_id,
            errors = ?errors,
            "record failed validation",
        );
    }

    let event = RecordValidated::new(&ingested.record_id, &ingested.partner_id, is_valid, errors);
    bus.publish(DomainEvent::RecordValidated(event))?;
    Ok(())
}

/// The fixed rule set, applied in order; pure over the payload.
///
/// Returns the validity flag and the (possibly empty) error list.
pub fn validate_payload(payload: &JsonValue) -> (bool, Vec<String>) {
    let mut errors = Vec::new();

    match payload.as_object() {
        None => errors.push("payload must be a JSON object".to_string()),
        Some(fields) => {
            if let Some(name) = fields.get("name") {
                let is_usable = name.as_str().is_some_and(|s| !s.trim().is_empty());
                if !is_usable {
                    errors.push("name must be a non-empty string".to_string());
                }
            }
            if let Some(age) = fields.get("age") {
                match age.as_f64() {
                    Some(age) if !(0.0..=120.0).contains(&age) => {
                        errors.push("age must be between 0 and 120".to_string());
                    }
                    Some(_) => {}
                    None => errors.push("age must be a number".to_string()),
                }
            }
        }
    }

    let is_valid = errors.is_empty();
    (is_valid, errors)
}
