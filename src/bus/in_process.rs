//! In-process fan-out bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::event::DomainEvent;

use super::event_bus::{dispatch_detached, BusError, EventBus, EventHandler};

/// Fan-out dispatch within a single runtime.
///
/// Each bus instance owns its subscriber registry, so tests and embedded
/// deployments can run several isolated buses side by side. `Clone` shares
/// the registry — producers and services hold handles to the same bus.
///
/// Delivery is fire-and-forget: handlers for the event's exact type each
/// run on their own thread, the publisher never waits, and an event
/// published with no subscribers is simply lost. Nothing survives a
/// restart; use [`DistributedBus`](super::DistributedBus) for durability.
#[derive(Clone, Default)]
pub struct InProcessBus {
    handlers: Arc<Mutex<HashMap<String, Vec<Arc<dyn EventHandler>>>>>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventBus for InProcessBus {
    fn publish(&self, event: DomainEvent) -> Result<(), BusError> {
        let targets = {
            let handlers = self
                .handlers
                .lock()
                .map_err(|_| BusError::LockPoisoned("publish"))?;
            handlers.get(event.event_type()).cloned().unwrap_or_default()
        };

        if targets.is_empty() {
            tracing::debug!(
                event_type = %event.event_type(),
                event_id = %event.event_id(),
                "no subscribers, event dropped",
            );
            return Ok(());
        }

        dispatch_detached(targets, &event);
        Ok(())
    }

    fn subscribe(
        &self,
        event_type: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), BusError> {
        if DomainEvent::descriptor_for(event_type).is_none() {
            return Err(BusError::UnknownEventType(event_type.to_string()));
        }
        let mut handlers = self
            .handlers
            .lock()
            .map_err(|_| BusError::LockPoisoned("subscribe"))?;
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }
}
