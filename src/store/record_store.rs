//! RecordStore - abstract storage for ingested records.

use std::fmt;

use super::record::IngestedRecord;

/// Error type for record store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    LockPoisoned(&'static str),
    /// `add` was called with an id that already exists.
    Duplicate(String),
    /// `update` was called for an id that does not exist.
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::Duplicate(id) => write!(f, "record {} already exists", id),
            StoreError::NotFound(id) => write!(f, "record {} not found", id),
        }
    }
}

impl std::error::Error for StoreError {}

/// Abstract CRUD storage for ingested records.
///
/// Implementations might include:
/// - `InMemoryRecordStore` - for testing and single-process scenarios
/// - a relational store - for production persistence (external)
pub trait RecordStore: Send + Sync {
    /// Add a new record. Fails if the id already exists.
    fn add(&self, record: IngestedRecord) -> Result<(), StoreError>;

    /// Replace an existing record. Fails if the id does not exist.
    fn update(&self, record: IngestedRecord) -> Result<(), StoreError>;

    /// Get a record by id. Returns `None` if not found.
    fn get_by_id(&self, id: &str) -> Result<Option<IngestedRecord>, StoreError>;

    /// All records in insertion order.
    fn get_all(&self) -> Result<Vec<IngestedRecord>, StoreError>;

    /// All records for one partner, in insertion order.
    fn get_by_partner(&self, partner_id: &str) -> Result<Vec<IngestedRecord>, StoreError>;
}
