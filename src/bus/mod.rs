//! Event bus — the sole coupling point between services.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  EventBus (trait)                            │
//! │  publish(event) / subscribe(event_type, handler) / close()  │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                  │
//!          ▼                                  ▼
//! ┌─────────────────┐             ┌───────────────────────────┐
//! │  InProcessBus   │             │   DistributedBus<B>        │
//! │  fan-out within │             │  topic per event type,     │
//! │  one runtime,   │             │  durable delivery,         │
//! │  thread per     │             │  ack/nack, listener loop   │
//! │  handler        │             │  per (topic, service)      │
//! └─────────────────┘             └───────────────────────────┘
//!                                             │
//!                                             ▼
//!                                 ┌───────────────────────────┐
//!                                 │  Broker transport traits   │
//!                                 │  InMemoryBroker (included) │
//!                                 │  Pulsar/Kafka (external)   │
//!                                 └───────────────────────────┘
//! ```
//!
//! Both backends share the delivery contract: `publish` returns once the
//! event is handed to the transport, handlers run concurrently in their
//! own threads, and a failing handler never reaches the publisher or its
//! sibling handlers.

mod config;
mod distributed;
mod event_bus;
mod in_memory_broker;
mod in_process;
mod topic;
mod transport;

pub use config::BusConfig;
pub use distributed::DistributedBus;
pub use event_bus::{BusError, EventBus, EventHandler, HandlerError};
pub use in_memory_broker::InMemoryBroker;
pub use in_process::InProcessBus;
pub use topic::{subscription_for, topic_for};
pub use transport::{Broker, Delivery, TopicConsumer, TopicProducer, TransportError};
