//! Record storage used by services inside their handlers.
//!
//! The bus has no dependency on this module; it exists because the
//! choreography's consumers look records up while reacting to events.

mod in_memory;
mod record;
mod record_store;

pub use in_memory::InMemoryRecordStore;
pub use record::IngestedRecord;
pub use record_store::{RecordStore, StoreError};
