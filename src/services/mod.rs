//! Choreography participants.
//!
//! Four independently deployable services coordinate through event
//! publication alone — no central orchestrator, no direct calls:
//!
//! ```text
//!   IngestionService ── RecordIngested ──┬──▶ ValidationService ── RecordValidated ──▶
//!                                        ├──▶ ProcessingService ── RecordProcessed ──▶
//!                                        └──▶ QueryService (cache warming)
//! ```
//!
//! Every service receives its bus instance (and record store, where
//! needed) at construction; each tolerates the others being absent.

mod ingestion;
mod processing;
mod query;
mod validation;

pub use ingestion::{IngestError, IngestionService};
pub use processing::ProcessingService;
pub use query::QueryService;
pub use validation::ValidationService;
