//! Core event bus trait and handler contract.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::thread;

use crate::event::{CodecError, DomainEvent};

use super::transport::TransportError;

/// Type-erased error returned by subscriber logic.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Subscriber callback invoked once per delivered event instance.
///
/// Handlers run on their own thread, concurrently with the publisher and
/// with each other. A returned error is logged and confined to that
/// handler; it never reaches the publisher. Under the distributed backend
/// events may be redelivered, so handlers must tolerate duplicates.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&DomainEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        self(event)
    }
}

/// Error type for bus operations.
#[derive(Debug)]
pub enum BusError {
    /// `subscribe` was called with a name outside the known event set.
    UnknownEventType(String),
    /// The event could not be serialized for the transport.
    Encode(CodecError),
    /// The underlying transport failed.
    Transport(TransportError),
    /// The bus was already closed.
    Closed,
    /// Internal bus state was poisoned by a panicking thread.
    LockPoisoned(&'static str),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::UnknownEventType(name) => {
                write!(f, "unknown event type: {}", name)
            }
            BusError::Encode(err) => write!(f, "failed to encode event: {}", err),
            BusError::Transport(err) => write!(f, "transport error: {}", err),
            BusError::Closed => write!(f, "bus is closed"),
            BusError::LockPoisoned(operation) => {
                write!(f, "bus state poisoned during {}", operation)
            }
        }
    }
}

impl Error for BusError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BusError::Encode(err) => Some(err),
            BusError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for BusError {
    fn from(err: CodecError) -> Self {
        BusError::Encode(err)
    }
}

impl From<TransportError> for BusError {
    fn from(err: TransportError) -> Self {
        BusError::Transport(err)
    }
}

/// Pluggable event distribution.
///
/// Producers and consumers share a bus instance (never a global) and stay
/// unaware of each other; the bus is their only channel.
pub trait EventBus: Send + Sync {
    /// Hand `event` to the transport for delivery to current subscribers
    /// of its exact type.
    ///
    /// Returns once the transport has the event — never waits for handler
    /// completion, and never reports per-subscriber failures.
    fn publish(&self, event: DomainEvent) -> Result<(), BusError>;

    /// Register `handler` for `event_type`.
    ///
    /// Registration is not deduplicated: the same handler subscribed twice
    /// is invoked twice per event. Concurrent calls are serialized by the
    /// bus.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>)
        -> Result<(), BusError>;

    /// Release transport resources and stop delivery.
    ///
    /// In-flight handler threads may complete, but no new receive starts
    /// after this returns. No-op for backends without resources to release.
    fn close(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// Fan a delivered event out to `handlers`, one thread per handler.
///
/// Shared by both backends: a slow or failing handler can block neither
/// the caller nor its siblings, and failures surface through logging only.
pub(crate) fn dispatch_detached(handlers: Vec<Arc<dyn EventHandler>>, event: &DomainEvent) {
    for handler in handlers {
        let event = event.clone();
        thread::spawn(move || {
            if let Err(err) = handler.handle(&event) {
                tracing::error!(
                    event_type = %event.event_type(),
                    event_id = %event.event_id(),
                    error = %err,
                    "event handler failed",
                );
            }
        });
    }
}
