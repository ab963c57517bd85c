//! In-memory broker for testing and single-process deployments.
//!
//! Implements the transport traits with Pulsar-shaped semantics:
//! - per-topic append-only message log, retained for the broker lifetime;
//! - named subscriptions, each with its own read position, created at the
//!   current end of the log;
//! - consumers sharing a subscription name compete for messages, distinct
//!   names each receive every message;
//! - `nack` schedules redelivery after a short delay, so a poison message
//!   cannot starve the subscription of newer messages;
//! - each broker handle is one connection; `close` wakes that
//!   connection's blocked receives and leaves other handles connected.
//!
//! Delivery is at-least-once: a message stays in the log after delivery
//! and reappears on the same subscription whenever it is nacked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::config::BusConfig;
use super::transport::{Broker, Delivery, TopicConsumer, TopicProducer, TransportError};

/// URL scheme accepted by [`InMemoryBroker::connect`].
const URL_SCHEME: &str = "memory://";

/// How long a nacked message waits before it is eligible for redelivery.
const REDELIVERY_DELAY: Duration = Duration::from_millis(50);

struct StoredMessage {
    id: u64,
    payload: Vec<u8>,
}

struct Redelivery {
    not_before: Instant,
    message_id: u64,
}

#[derive(Default)]
struct Subscription {
    /// Next unread position in the topic log.
    cursor: usize,
    /// Nacked messages waiting to be handed out again.
    redeliver: Vec<Redelivery>,
    /// Acknowledged message ids, kept for introspection.
    acked: Vec<u64>,
}

#[derive(Default)]
struct TopicState {
    log: Vec<StoredMessage>,
    subscriptions: HashMap<String, Subscription>,
}

struct BrokerInner {
    topics: Mutex<HashMap<String, TopicState>>,
    wakeup: Condvar,
    next_id: AtomicU64,
}

/// Shared-state in-memory broker. Topics are shared between handles, but
/// each handle is its own connection: `clone` opens a fresh connection
/// into the same topics, and `close` severs only the closing handle and
/// the producers and consumers it created. Buses holding other handles
/// keep talking, the way separate processes keep talking through a
/// cluster after one of them disconnects.
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
    closed: Arc<AtomicBool>,
}

impl Clone for InMemoryBroker {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: Mutex::new(HashMap::new()),
                wakeup: Condvar::new(),
                next_id: AtomicU64::new(1),
            }),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of messages retained on a topic.
    pub fn topic_len(&self, topic: &str) -> usize {
        self.inner
            .topics
            .lock()
            .map(|topics| topics.get(topic).map(|t| t.log.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Message ids acknowledged on a subscription, in ack order.
    pub fn acknowledged(&self, topic: &str, subscription: &str) -> Vec<u64> {
        self.inner
            .topics
            .lock()
            .map(|topics| {
                topics
                    .get(topic)
                    .and_then(|t| t.subscriptions.get(subscription))
                    .map(|s| s.acked.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

impl Broker for InMemoryBroker {
    type Producer = InMemoryProducer;
    type Consumer = InMemoryConsumer;

    fn connect(config: &BusConfig) -> Result<Self, TransportError> {
        if !config.service_url.starts_with(URL_SCHEME) {
            return Err(TransportError::ConnectionFailed(format!(
                "in-memory broker cannot serve '{}' (expected a {} url)",
                config.service_url, URL_SCHEME,
            )));
        }
        Ok(Self::new())
    }

    fn create_producer(&self, topic: &str) -> Result<InMemoryProducer, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Disconnected);
        }
        let mut topics = lock_topics(&self.inner)?;
        topics.entry(topic.to_string()).or_default();
        Ok(InMemoryProducer {
            inner: Arc::clone(&self.inner),
            closed: Arc::clone(&self.closed),
            topic: topic.to_string(),
        })
    }

    fn create_consumer(
        &self,
        topic: &str,
        subscription: &str,
    ) -> Result<InMemoryConsumer, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Disconnected);
        }
        let mut topics = lock_topics(&self.inner)?;
        let state = topics.entry(topic.to_string()).or_default();
        let position = state.log.len();
        state
            .subscriptions
            .entry(subscription.to_string())
            .or_insert_with(|| Subscription {
                cursor: position,
                ..Subscription::default()
            });
        Ok(InMemoryConsumer {
            inner: Arc::clone(&self.inner),
            closed: Arc::clone(&self.closed),
            topic: topic.to_string(),
            subscription: subscription.to_string(),
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        // Take the lock so receivers can't miss the wakeup between their
        // closed-check and their wait. Receivers on other connections wake
        // too, see their own flag unset, and keep waiting.
        let _guard = self.inner.topics.lock();
        self.inner.wakeup.notify_all();
    }
}

fn lock_topics(
    inner: &BrokerInner,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, TopicState>>, TransportError> {
    inner
        .topics
        .lock()
        .map_err(|_| TransportError::Receive("broker state poisoned".into()))
}

/// Producer handle scoped to one topic, tied to its creating connection.
pub struct InMemoryProducer {
    inner: Arc<BrokerInner>,
    closed: Arc<AtomicBool>,
    topic: String,
}

impl TopicProducer for InMemoryProducer {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Disconnected);
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut topics = self
            .inner
            .topics
            .lock()
            .map_err(|_| TransportError::Send("broker state poisoned".into()))?;
        topics.entry(self.topic.clone()).or_default().log.push(StoredMessage {
            id,
            payload: payload.to_vec(),
        });
        self.inner.wakeup.notify_all();
        Ok(())
    }
}

/// Consumer handle scoped to one (topic, subscription) pair, tied to its
/// creating connection.
pub struct InMemoryConsumer {
    inner: Arc<BrokerInner>,
    closed: Arc<AtomicBool>,
    topic: String,
    subscription: String,
}

impl InMemoryConsumer {
    fn try_take(
        &self,
        topics: &mut HashMap<String, TopicState>,
    ) -> Result<Option<Delivery>, TransportError> {
        let state = topics
            .get_mut(&self.topic)
            .ok_or_else(|| TransportError::Receive(format!("unknown topic {}", self.topic)))?;
        let log = &state.log;
        let sub = state
            .subscriptions
            .get_mut(&self.subscription)
            .ok_or_else(|| {
                TransportError::Receive(format!("unknown subscription {}", self.subscription))
            })?;

        // Due redeliveries first, then the next unread message.
        let now = Instant::now();
        if let Some(due) = sub.redeliver.iter().position(|r| r.not_before <= now) {
            let redelivery = sub.redeliver.remove(due);
            if let Some(message) = log.iter().find(|m| m.id == redelivery.message_id) {
                return Ok(Some(Delivery {
                    message_id: message.id,
                    payload: message.payload.clone(),
                }));
            }
        }

        if sub.cursor < log.len() {
            let message = &log[sub.cursor];
            sub.cursor += 1;
            return Ok(Some(Delivery {
                message_id: message.id,
                payload: message.payload.clone(),
            }));
        }

        Ok(None)
    }
}

impl TopicConsumer for InMemoryConsumer {
    fn receive(&self, timeout: Duration) -> Result<Option<Delivery>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut topics = lock_topics(&self.inner)?;

        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(TransportError::Disconnected);
            }

            if let Some(delivery) = self.try_take(&mut topics)? {
                return Ok(Some(delivery));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            // Cap each wait at the redelivery delay so nacked messages
            // become visible as soon as they are due.
            let wait = (deadline - now).min(REDELIVERY_DELAY);
            let (guard, _) = self
                .inner
                .wakeup
                .wait_timeout(topics, wait)
                .map_err(|_| TransportError::Receive("broker state poisoned".into()))?;
            topics = guard;
        }
    }

    fn ack(&self, message_id: u64) -> Result<(), TransportError> {
        let mut topics = lock_topics(&self.inner)?;
        if let Some(sub) = topics
            .get_mut(&self.topic)
            .and_then(|t| t.subscriptions.get_mut(&self.subscription))
        {
            sub.acked.push(message_id);
        }
        Ok(())
    }

    fn nack(&self, message_id: u64) -> Result<(), TransportError> {
        let mut topics = lock_topics(&self.inner)?;
        if let Some(sub) = topics
            .get_mut(&self.topic)
            .and_then(|t| t.subscriptions.get_mut(&self.subscription))
        {
            sub.redeliver.push(Redelivery {
                not_before: Instant::now() + REDELIVERY_DELAY,
                message_id,
            });
        }
        self.inner.wakeup.notify_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn broker() -> InMemoryBroker {
        InMemoryBroker::new()
    }

    #[test]
    fn connect_rejects_foreign_urls() {
        let config = BusConfig::default().with_service_url("pulsar://localhost:6650");
        let Err(err) = InMemoryBroker::connect(&config) else {
            panic!("expected connect to fail");
        };
        assert!(matches!(err, TransportError::ConnectionFailed(_)));

        assert!(InMemoryBroker::connect(&BusConfig::default()).is_ok());
    }

    #[test]
    fn send_then_receive() {
        let broker = broker();
        let consumer = broker.create_consumer("events/A", "svc-A").unwrap();
        let producer = broker.create_producer("events/A").unwrap();

        producer.send(b"one").unwrap();

        let delivery = consumer.receive(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(delivery.payload, b"one");
    }

    #[test]
    fn subscription_starts_at_end_of_log() {
        let broker = broker();
        let producer = broker.create_producer("events/A").unwrap();
        producer.send(b"early").unwrap();

        let consumer = broker.create_consumer("events/A", "svc-A").unwrap();
        producer.send(b"late").unwrap();

        let delivery = consumer.receive(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(delivery.payload, b"late");
        assert!(consumer.receive(Duration::from_millis(20)).unwrap().is_none());
    }

    #[test]
    fn distinct_subscriptions_both_see_every_message() {
        let broker = broker();
        let a = broker.create_consumer("events/A", "svc-A").unwrap();
        let b = broker.create_consumer("events/A", "svc-B").unwrap();
        let producer = broker.create_producer("events/A").unwrap();

        producer.send(b"m").unwrap();

        assert!(a.receive(Duration::from_secs(1)).unwrap().is_some());
        assert!(b.receive(Duration::from_secs(1)).unwrap().is_some());
    }

    #[test]
    fn shared_subscription_competes_for_messages() {
        let broker = broker();
        let a = broker.create_consumer("events/A", "svc-A").unwrap();
        let b = broker.create_consumer("events/A", "svc-A").unwrap();
        let producer = broker.create_producer("events/A").unwrap();

        producer.send(b"m1").unwrap();
        producer.send(b"m2").unwrap();

        let first = a.receive(Duration::from_secs(1)).unwrap().unwrap();
        let second = b.receive(Duration::from_secs(1)).unwrap().unwrap();
        assert_ne!(first.message_id, second.message_id);
        assert!(a.receive(Duration::from_millis(20)).unwrap().is_none());
    }

    #[test]
    fn nack_redelivers_after_delay() {
        let broker = broker();
        let consumer = broker.create_consumer("events/A", "svc-A").unwrap();
        let producer = broker.create_producer("events/A").unwrap();

        producer.send(b"m").unwrap();

        let first = consumer.receive(Duration::from_secs(1)).unwrap().unwrap();
        consumer.nack(first.message_id).unwrap();

        let again = consumer.receive(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(again.message_id, first.message_id);
        assert_eq!(again.payload, b"m");
    }

    #[test]
    fn nacked_message_does_not_starve_newer_ones() {
        let broker = broker();
        let consumer = broker.create_consumer("events/A", "svc-A").unwrap();
        let producer = broker.create_producer("events/A").unwrap();

        producer.send(b"poison").unwrap();
        producer.send(b"good").unwrap();

        let poison = consumer.receive(Duration::from_secs(1)).unwrap().unwrap();
        consumer.nack(poison.message_id).unwrap();

        // The next receive serves the newer message while the nacked one
        // waits out its redelivery delay.
        let good = consumer.receive(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(good.payload, b"good");
    }

    #[test]
    fn close_wakes_blocked_receive() {
        let broker = broker();
        let consumer = broker.create_consumer("events/A", "svc-A").unwrap();

        let waiter = thread::spawn(move || consumer.receive(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(50));
        broker.close();

        let result = waiter.join().unwrap();
        assert_eq!(result.unwrap_err(), TransportError::Disconnected);
    }

    #[test]
    fn close_severs_only_the_closing_handle() {
        let a = broker();
        let b = a.clone();
        let consumer_b = b.create_consumer("events/A", "svc-B").unwrap();
        let producer_b = b.create_producer("events/A").unwrap();

        a.close();

        // b's connection keeps working over the shared topics.
        producer_b.send(b"m").unwrap();
        let delivery = consumer_b.receive(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(delivery.payload, b"m");

        // a's own connection is gone.
        assert!(matches!(
            a.create_producer("events/A"),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn ack_is_recorded() {
        let broker = broker();
        let consumer = broker.create_consumer("events/A", "svc-A").unwrap();
        let producer = broker.create_producer("events/A").unwrap();

        producer.send(b"m").unwrap();
        let delivery = consumer.receive(Duration::from_secs(1)).unwrap().unwrap();
        consumer.ack(delivery.message_id).unwrap();

        assert_eq!(broker.acknowledged("events/A", "svc-A"), vec![delivery.message_id]);
    }
}
