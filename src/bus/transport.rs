//! Broker transport traits for the distributed backend.
//!
//! A broker exposes topic-scoped producer and consumer handles. The
//! included [`InMemoryBroker`](super::InMemoryBroker) implements these for
//! tests and single-process deployments; clients for real brokers (Pulsar,
//! Kafka) implement the same traits externally.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use super::config::BusConfig;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The configured endpoint could not be reached at startup. Fatal to
    /// the owning service process.
    ConnectionFailed(String),
    /// The transport connection was closed.
    Disconnected,
    /// A send failed after the connection was established.
    Send(String),
    /// A receive failed after the connection was established. Transient;
    /// listener loops retry these.
    Receive(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            TransportError::Disconnected => write!(f, "transport disconnected"),
            TransportError::Send(msg) => write!(f, "send failed: {}", msg),
            TransportError::Receive(msg) => write!(f, "receive failed: {}", msg),
        }
    }
}

impl Error for TransportError {}

/// A message handed to a consumer, identified for ack/nack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: u64,
    pub payload: Vec<u8>,
}

/// Topic-scoped producer handle, cached by the bus for its lifetime.
pub trait TopicProducer: Send {
    /// Send a payload to the producer's topic. Returns once the broker has
    /// the message; never waits on subscriber processing.
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;
}

/// Topic-scoped consumer handle bound to a named subscription.
pub trait TopicConsumer: Send {
    /// Block up to `timeout` for the next message. `Ok(None)` means the
    /// timeout elapsed; callers re-check their shutdown signal and loop.
    fn receive(&self, timeout: Duration) -> Result<Option<Delivery>, TransportError>;

    /// Mark a delivery as processed; the broker will not redeliver it.
    fn ack(&self, message_id: u64) -> Result<(), TransportError>;

    /// Request redelivery of a delivery that could not be processed.
    fn nack(&self, message_id: u64) -> Result<(), TransportError>;
}

/// Connection to a message broker.
pub trait Broker: Send + Sync + 'static {
    type Producer: TopicProducer + 'static;
    type Consumer: TopicConsumer + 'static;

    /// Establish the connection described by `config`. Endpoint problems
    /// surface here, not on first use.
    fn connect(config: &BusConfig) -> Result<Self, TransportError>
    where
        Self: Sized;

    fn create_producer(&self, topic: &str) -> Result<Self::Producer, TransportError>;

    /// Create a consumer on `topic` reading through `subscription`. The
    /// subscription is created at the current end of the topic if it does
    /// not exist yet.
    fn create_consumer(
        &self,
        topic: &str,
        subscription: &str,
    ) -> Result<Self::Consumer, TransportError>;

    /// Close the connection, waking any blocked receives.
    fn close(&self);
}
