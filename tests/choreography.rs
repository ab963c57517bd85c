//! End-to-end choreography: ingestion, validation, processing, and query
//! services coordinating through the bus alone.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use choreo::{
    BusConfig, DistributedBus, DomainEvent, EventBus, InMemoryBroker, InMemoryRecordStore,
    IngestionService, ProcessingService, QueryService, RecordIngested, RecordProcessed,
    RecordValidated, ValidationService,
};

const WAIT: Duration = Duration::from_secs(2);

fn probe(bus: &dyn EventBus, event_type: &str) -> mpsc::Receiver<DomainEvent> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (tx, rx) = mpsc::channel();
    bus.subscribe(
        event_type,
        Arc::new(move |event: &DomainEvent| {
            tx.send(event.clone()).ok();
            Ok(())
        }),
    )
    .unwrap();
    rx
}

#[test]
fn invalid_record_is_flagged_with_age_range_error() {
    let store = Arc::new(InMemoryRecordStore::new());
    let bus = Arc::new(choreo::InProcessBus::new());

    ValidationService::new(store.clone(), bus.clone()).start().unwrap();
    let validated = probe(bus.as_ref(), RecordValidated::EVENT_TYPE);

    let ingestion = IngestionService::new(store, bus);
    let record = ingestion.ingest("p1", json!({"age": 200})).unwrap();

    let event = validated.recv_timeout(WAIT).unwrap();
    let DomainEvent::RecordValidated(outcome) = event else {
        panic!("expected RecordValidated");
    };
    assert_eq!(outcome.record_id, record.id);
    assert_eq!(outcome.partner_id, "p1");
    assert!(!outcome.is_valid);
    assert!(!outcome.validation_errors.is_empty());
    assert!(outcome
        .validation_errors
        .iter()
        .any(|e| e.contains("age must be between 0 and 120")));
}

#[test]
fn valid_record_passes_with_no_errors() {
    let store = Arc::new(InMemoryRecordStore::new());
    let bus = Arc::new(choreo::InProcessBus::new());

    ValidationService::new(store.clone(), bus.clone()).start().unwrap();
    let validated = probe(bus.as_ref(), RecordValidated::EVENT_TYPE);

    IngestionService::new(store, bus)
        .ingest("p1", json!({"name": "Ada", "age": 36}))
        .unwrap();

    let DomainEvent::RecordValidated(outcome) = validated.recv_timeout(WAIT).unwrap() else {
        panic!("expected RecordValidated");
    };
    assert!(outcome.is_valid);
    assert!(outcome.validation_errors.is_empty());
}

#[test]
fn validation_and_processing_both_fire_from_one_publish() {
    let store = Arc::new(InMemoryRecordStore::new());
    let bus = Arc::new(choreo::InProcessBus::new());

    ValidationService::new(store.clone(), bus.clone()).start().unwrap();
    ProcessingService::new(bus.clone()).start().unwrap();
    let validated = probe(bus.as_ref(), RecordValidated::EVENT_TYPE);
    let processed = probe(bus.as_ref(), RecordProcessed::EVENT_TYPE);

    let record = IngestionService::new(store, bus)
        .ingest("p1", json!({"name": "Ada"}))
        .unwrap();

    // Both independent subscriptions react, in either order.
    let DomainEvent::RecordValidated(v) = validated.recv_timeout(WAIT).unwrap() else {
        panic!("expected RecordValidated");
    };
    let DomainEvent::RecordProcessed(p) = processed.recv_timeout(WAIT).unwrap() else {
        panic!("expected RecordProcessed");
    };
    assert_eq!(v.record_id, record.id);
    assert_eq!(p.record_id, record.id);
    assert_eq!(p.result["processed"], true);
}

#[test]
fn query_service_warms_its_cache_from_events() {
    let store = Arc::new(InMemoryRecordStore::new());
    let bus = Arc::new(choreo::InProcessBus::new());

    let query = QueryService::new(store.clone(), bus.clone());
    query.start().unwrap();

    let record = IngestionService::new(store, bus)
        .ingest("p1", json!({"name": "Ada"}))
        .unwrap();

    let deadline = std::time::Instant::now() + WAIT;
    while !query.is_warm(&record.id) && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(query.is_warm(&record.id));
    assert_eq!(query.get_by_id(&record.id).unwrap(), Some(record));
}

/// The same choreography over the distributed backend: one bus instance
/// per service, all talking through a shared broker, each with its own
/// subscription identity.
#[test]
fn distributed_choreography_across_service_buses() {
    let broker = InMemoryBroker::new();
    let store = Arc::new(InMemoryRecordStore::new());

    let ingestion_bus: Arc<dyn EventBus> = Arc::new(DistributedBus::new(
        broker.clone(),
        BusConfig::new("ingestion-service"),
    ));
    let validation_bus: Arc<dyn EventBus> = Arc::new(DistributedBus::new(
        broker.clone(),
        BusConfig::new("validation-service"),
    ));
    let processing_bus: Arc<dyn EventBus> = Arc::new(DistributedBus::new(
        broker.clone(),
        BusConfig::new("processing-service"),
    ));
    let probe_bus: Arc<dyn EventBus> = Arc::new(DistributedBus::new(
        broker.clone(),
        BusConfig::new("probe-service"),
    ));

    ValidationService::new(store.clone(), validation_bus.clone()).start().unwrap();
    ProcessingService::new(processing_bus.clone()).start().unwrap();
    let validated = probe(probe_bus.as_ref(), RecordValidated::EVENT_TYPE);
    let processed = probe(probe_bus.as_ref(), RecordProcessed::EVENT_TYPE);

    let record = IngestionService::new(store, ingestion_bus.clone())
        .ingest("p1", json!({"age": 200}))
        .unwrap();

    let DomainEvent::RecordValidated(v) = validated.recv_timeout(WAIT).unwrap() else {
        panic!("expected RecordValidated");
    };
    assert_eq!(v.record_id, record.id);
    assert!(!v.is_valid);
    assert!(v
        .validation_errors
        .iter()
        .any(|e| e.contains("age must be between 0 and 120")));

    let DomainEvent::RecordProcessed(p) = processed.recv_timeout(WAIT).unwrap() else {
        panic!("expected RecordProcessed");
    };
    assert_eq!(p.record_id, record.id);

    for bus in [ingestion_bus, validation_bus, processing_bus, probe_bus] {
        bus.close().unwrap();
    }
}

#[test]
fn ingested_event_carries_record_identity_and_timestamp() {
    let store = Arc::new(InMemoryRecordStore::new());
    let bus = Arc::new(choreo::InProcessBus::new());

    let ingested = probe(bus.as_ref(), RecordIngested::EVENT_TYPE);

    let record = IngestionService::new(store, bus)
        .ingest("p1", json!({"name": "Ada"}))
        .unwrap();

    let DomainEvent::RecordIngested(event) = ingested.recv_timeout(WAIT).unwrap() else {
        panic!("expected RecordIngested");
    };
    assert_eq!(event.record_id, record.id);
    assert_eq!(event.partner_id, record.partner_id);
    assert_eq!(event.ingested_at, record.ingested_at);
}
