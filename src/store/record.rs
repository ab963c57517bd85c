//! The ingested partner record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A partner-submitted record as accepted by the ingestion service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestedRecord {
    pub id: String,
    pub partner_id: String,
    /// Free-form submission payload; validation rules inspect its fields.
    pub payload: JsonValue,
    pub ingested_at: DateTime<Utc>,
}

impl IngestedRecord {
    /// Build a record with a fresh UUID id and the current timestamp.
    pub fn new(partner_id: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            partner_id: partner_id.into(),
            payload,
            ingested_at: Utc::now(),
        }
    }

    /// Build a record with a caller-chosen id (imports, tests).
    pub fn with_id(
        id: impl Into<String>,
        partner_id: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            id: id.into(),
            partner_id: partner_id.into(),
            payload,
            ingested_at: Utc::now(),
        }
    }
}
