//! choreo — event-choreographed ingestion of partner-submitted records.
//!
//! Partner records arrive at an ingestion producer and propagate as typed
//! domain events to downstream consumers (validation, processing, query
//! cache warming) that the producer never learns about. The event bus is
//! the only coupling point, with two interchangeable backends:
//!
//! - [`InProcessBus`] — fan-out within one runtime, thread per handler,
//!   no delivery guarantees across restarts;
//! - [`DistributedBus`] — topic per event type over a broker transport,
//!   durable delivery with ack/nack and per-service subscriptions. The
//!   included [`InMemoryBroker`] serves tests and single-process
//!   deployments; real broker clients implement the same [`Broker`]
//!   traits externally.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use choreo::{
//!     InMemoryRecordStore, InProcessBus, IngestionService, ValidationService,
//! };
//!
//! let store = Arc::new(InMemoryRecordStore::new());
//! let bus = Arc::new(InProcessBus::new());
//!
//! ValidationService::new(store.clone(), bus.clone()).start().unwrap();
//!
//! let ingestion = IngestionService::new(store, bus);
//! let record = ingestion
//!     .ingest("partner-1", serde_json::json!({"name": "Ada", "age": 36}))
//!     .unwrap();
//! assert_eq!(record.partner_id, "partner-1");
//! // Validation reacts asynchronously and publishes RecordValidated.
//! ```

pub mod bus;
pub mod event;
pub mod services;
pub mod store;

pub use bus::{
    subscription_for, topic_for, Broker, BusConfig, BusError, Delivery, DistributedBus, EventBus,
    EventHandler, HandlerError, InMemoryBroker, InProcessBus, TopicConsumer, TopicProducer,
    TransportError,
};
pub use event::{
    CodecError, DomainEvent, EventDescriptor, EventTypeRegistry, RecordIngested, RecordProcessed,
    RecordValidated,
};
pub use services::{
    IngestError, IngestionService, ProcessingService, QueryService, ValidationService,
};
pub use store::{IngestedRecord, InMemoryRecordStore, RecordStore, StoreError};
