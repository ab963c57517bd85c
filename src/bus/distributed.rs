//! Distributed pub/sub bus: topic per event type, durable delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::event::{self, DomainEvent, EventTypeRegistry};

use super::config::BusConfig;
use super::event_bus::{dispatch_detached, BusError, EventBus, EventHandler};
use super::topic::{subscription_for, topic_for};
use super::transport::{Broker, TopicConsumer, TopicProducer, TransportError};

/// Poll granularity of the blocking receive. Bounds how long close() can
/// wait for a listener to notice the shutdown flag.
const RECEIVE_POLL: Duration = Duration::from_millis(100);

/// Pause before re-entering the receive loop after a transport error.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

type HandlerMap = HashMap<String, Vec<Arc<dyn EventHandler>>>;

/// Durable, cross-process event distribution over a broker.
///
/// Every event type maps to its own topic (`topic_for`), computed
/// identically by every service instance — the mapping is the discovery
/// mechanism. Each bus carries one service identity; its subscriptions are
/// named `<service>-<event_type>`, so same-named services compete for
/// messages while distinct services each see every event.
///
/// Producer handles are created lazily on first publish per topic and
/// cached for the bus lifetime. The first `subscribe` for an event type
/// creates one consumer and one listener thread for its topic; later
/// subscribes for that type only add handlers to the same loop — never a
/// second consumer, so one logical service never fetches a message twice.
///
/// Delivery is at-least-once: messages are acknowledged after handler
/// dispatch and negatively acknowledged (requesting broker redelivery) on
/// any decode or dispatch-setup failure. Handlers must be idempotent or
/// tolerate duplicates.
pub struct DistributedBus<B: Broker> {
    broker: B,
    config: BusConfig,
    producers: Mutex<HashMap<String, B::Producer>>,
    listeners: Mutex<HashMap<String, JoinHandle<()>>>,
    handlers: Arc<Mutex<HandlerMap>>,
    registry: Arc<RwLock<EventTypeRegistry>>,
    shutdown: Arc<AtomicBool>,
}

impl<B: Broker> DistributedBus<B> {
    /// Wrap an already-connected broker.
    pub fn new(broker: B, config: BusConfig) -> Self {
        Self {
            broker,
            config,
            producers: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            handlers: Arc::new(Mutex::new(HashMap::new())),
            registry: Arc::new(RwLock::new(EventTypeRegistry::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Connect to the broker described by `config`.
    ///
    /// An unreachable endpoint fails here, at initialization — fatal to
    /// the owning service — rather than on first use.
    pub fn connect(config: BusConfig) -> Result<Self, BusError> {
        let broker = B::connect(&config)?;
        Ok(Self::new(broker, config))
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    fn spawn_listener(&self, topic: String, event_type: &str) -> Result<JoinHandle<()>, BusError> {
        let subscription = subscription_for(&self.config.service_name, event_type);
        let consumer = self.broker.create_consumer(&topic, &subscription)?;

        let handlers = Arc::clone(&self.handlers);
        let registry = Arc::clone(&self.registry);
        let shutdown = Arc::clone(&self.shutdown);

        Ok(thread::spawn(move || {
            listener_loop(consumer, topic, subscription, handlers, registry, shutdown)
        }))
    }
}

impl<B: Broker> EventBus for DistributedBus<B> {
    fn publish(&self, event: DomainEvent) -> Result<(), BusError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }

        let payload = event::encode(&event)?;
        let topic = topic_for(&self.config.namespace, event.event_type());

        let mut producers = self
            .producers
            .lock()
            .map_err(|_| BusError::LockPoisoned("publish"))?;
        let producer = match producers.entry(topic.clone()) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(self.broker.create_producer(&topic)?)
            }
        };
        producer.send(&payload)?;

        tracing::debug!(
            event_type = %event.event_type(),
            event_id = %event.event_id(),
            %topic,
            "event published",
        );
        Ok(())
    }

    fn subscribe(
        &self,
        event_type: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), BusError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }

        let descriptor = DomainEvent::descriptor_for(event_type)
            .ok_or_else(|| BusError::UnknownEventType(event_type.to_string()))?;
        self.registry
            .write()
            .map_err(|_| BusError::LockPoisoned("subscribe"))?
            .register(descriptor);

        // The listener lock is held across the loop creation and the
        // handler insert, so racing subscribe calls cannot create two
        // consumers for one topic. The listener must exist before the
        // handler is recorded: a failed consumer creation leaves no
        // registration behind for a later retry to double-dispatch.
        let mut listeners = self
            .listeners
            .lock()
            .map_err(|_| BusError::LockPoisoned("subscribe"))?;

        let topic = topic_for(&self.config.namespace, event_type);
        if !listeners.contains_key(&topic) {
            let handle = self.spawn_listener(topic.clone(), event_type)?;
            listeners.insert(topic, handle);
        }

        self.handlers
            .lock()
            .map_err(|_| BusError::LockPoisoned("subscribe"))?
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }

    fn close(&self) -> Result<(), BusError> {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // Wake listeners blocked in receive, then release cached handles.
        self.broker.close();
        if let Ok(mut producers) = self.producers.lock() {
            producers.clear();
        }

        let handles: Vec<(String, JoinHandle<()>)> = {
            let mut listeners = self
                .listeners
                .lock()
                .map_err(|_| BusError::LockPoisoned("close"))?;
            listeners.drain().collect()
        };
        for (topic, handle) in handles {
            if handle.join().is_err() {
                tracing::error!(%topic, "listener thread panicked");
            }
        }

        tracing::debug!(service = %self.config.service_name, "bus closed");
        Ok(())
    }
}

/// One loop per (topic, service identity) pair, on its own thread.
///
/// receive → decode → dispatch each local handler on its own thread →
/// ack; decode or dispatch-setup failures nack so the broker redelivers.
/// Transient receive errors are retried indefinitely; the loop ends on
/// shutdown or when the transport disconnects.
fn listener_loop<C: TopicConsumer>(
    consumer: C,
    topic: String,
    subscription: String,
    handlers: Arc<Mutex<HandlerMap>>,
    registry: Arc<RwLock<EventTypeRegistry>>,
    shutdown: Arc<AtomicBool>,
) {
    tracing::debug!(%topic, %subscription, "listener started");

    while !shutdown.load(Ordering::Acquire) {
        let delivery = match consumer.receive(RECEIVE_POLL) {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(TransportError::Disconnected) => {
                // The connection is gone for good; nothing to retry.
                if !shutdown.load(Ordering::Acquire) {
                    tracing::warn!(%topic, "transport disconnected");
                }
                break;
            }
            Err(err) => {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }
                tracing::warn!(%topic, error = %err, "receive failed, retrying");
                thread::sleep(RETRY_BACKOFF);
                continue;
            }
        };

        let decoded = match registry.read() {
            Ok(registry) => event::decode(&delivery.payload, &registry),
            Err(_) => {
                nack_logged(&consumer, &topic, delivery.message_id, "registry poisoned");
                continue;
            }
        };

        match decoded {
            Ok(event) => {
                let targets = match handlers.lock() {
                    Ok(map) => map.get(event.event_type()).cloned().unwrap_or_default(),
                    Err(_) => {
                        nack_logged(&consumer, &topic, delivery.message_id, "handlers poisoned");
                        continue;
                    }
                };
                dispatch_detached(targets, &event);
                if let Err(err) = consumer.ack(delivery.message_id) {
                    tracing::warn!(%topic, message_id = delivery.message_id, error = %err, "ack failed");
                }
            }
            Err(err) => {
                nack_logged(&consumer, &topic, delivery.message_id, &err.to_string());
            }
        }
    }

    tracing::debug!(%topic, %subscription, "listener stopped");
}

fn nack_logged<C: TopicConsumer>(consumer: &C, topic: &str, message_id: u64, reason: &str) {
    tracing::warn!(%topic, message_id, reason, "requesting redelivery");
    if let Err(err) = consumer.nack(message_id) {
        tracing::warn!(%topic, message_id, error = %err, "nack failed");
    }
}
