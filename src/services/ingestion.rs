//! Ingestion service - accepts partner records and announces them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::bus::{BusError, EventBus};
use crate::event::{DomainEvent, RecordIngested};
use crate::store::{IngestedRecord, RecordStore, StoreError};

/// Error type for ingestion requests, reported to the submitting caller.
#[derive(Debug)]
pub enum IngestError {
    EmptyPartnerId,
    PayloadNotAnObject,
    Store(StoreError),
    Publish(BusError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::EmptyPartnerId => write!(f, "partner id must not be empty"),
            IngestError::PayloadNotAnObject => write!(f, "payload must be a JSON object"),
            IngestError::Store(err) => write!(f, "failed to store record: {}", err),
            IngestError::Publish(err) => write!(f, "failed to publish event: {}", err),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Store(err) => Some(err),
            IngestError::Publish(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Store(err)
    }
}

impl From<BusError> for IngestError {
    fn from(err: BusError) -> Self {
        IngestError::Publish(err)
    }
}

/// Accepts partner submissions, stores them, and publishes one
/// `RecordIngested` event per successful creation.
///
/// Downstream reactions are fire-and-forget: this service never learns
/// who subscribed or whether their handlers succeeded.
pub struct IngestionService {
    store: Arc<dyn RecordStore>,
    bus: Arc<dyn EventBus>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn RecordStore>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// Ingest one submission. Returns the stored record.
    pub fn ingest(
        &self,
        partner_id: &str,
        payload: JsonValue,
    ) -> Result<IngestedRecord, IngestError> {
        if partner_id.trim().is_empty() {
            return Err(IngestError::EmptyPartnerId);
        }
        if !payload.is_object() {
            return Err(IngestError::PayloadNotAnObject);
        }

        let record = IngestedRecord::new(partner_id, payload);
        self.store.add(record.clone())?;

        let event = RecordIngested::new(&record.id, &record.partner_id, record.ingested_at);
        self.bus.publish(DomainEvent::RecordIngested(event))?;

        tracing::info!(
            record_id = %record.id,
            partner_id = %record.partner_id,
            "record ingested",
        );
        Ok(record)
    }
}
