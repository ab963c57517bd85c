//! Processing service - reacts to ingested records with its own work.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use crate::bus::{BusError, EventBus, HandlerError};
use crate::event::{DomainEvent, RecordIngested, RecordProcessed};

/// Subscribes to `RecordIngested` independently of validation and
/// publishes one `RecordProcessed` carrying the result payload.
pub struct ProcessingService {
    bus: Arc<dyn EventBus>,
}

impl ProcessingService {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Register this service's subscription on the bus.
    pub fn start(&self) -> Result<(), BusError> {
        let bus = Arc::clone(&self.bus);
        self.bus.subscribe(
            RecordIngested::EVENT_TYPE,
            Arc::new(move |event: &DomainEvent| {
                let DomainEvent::RecordIngested(ingested) = event else {
                    return Ok(());
                };
                on_record_ingested(&bus, ingested)
            }),
        )
    }
}

fn on_record_ingested(
    bus: &Arc<dyn EventBus>,
    ingested: &RecordIngested,
) -> Result<(), HandlerError> {
    tracing::info!(
        record_id = %ingested.record_id,
        partner_id = %ingested.partner_id,
        "processing record",
    );

    let result = process(&ingested.record_id, &ingested.partner_id);
    let event = RecordProcessed::new(&ingested.record_id, &ingested.partner_id, result);
    bus.publish(DomainEvent::RecordProcessed(event))?;
    Ok(())
}

/// Produce the processing result payload for a record.
fn process(record_id: &str, partner_id: &str) -> JsonValue {
    json!({
        "processed": true,
        "record_id": record_id,
        "partner_id": partner_id,
        "processed_at": Utc::now().to_rfc3339(),
        "summary": format!("record {} processed successfully", record_id),
    })
}
