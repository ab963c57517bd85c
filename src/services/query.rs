//! Query service - read-side facade with an event-warmed cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::bus::{BusError, EventBus, HandlerError};
use crate::event::{DomainEvent, RecordIngested};
use crate::store::{IngestedRecord, RecordStore, StoreError};

/// Serves record lookups, warming an id-keyed cache from
/// `RecordIngested` events so fresh records are answered without a store
/// round trip.
pub struct QueryService {
    store: Arc<dyn RecordStore>,
    bus: Arc<dyn EventBus>,
    cache: Arc<RwLock<HashMap<String, IngestedRecord>>>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            store,
            bus,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register the cache-warming subscription on the bus.
    pub fn start(&self) -> Result<(), BusError> {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        self.bus.subscribe(
            RecordIngested::EVENT_TYPE,
            Arc::new(move |event: &DomainEvent| {
                let DomainEvent::RecordIngested(ingested) = event else {
                    return Ok(());
                };
                warm_cache(&store, &cache, ingested)
            }),
        )
    }

    /// Get a record by id, preferring the warmed cache.
    pub fn get_by_id(&self, id: &str) -> Result<Option<IngestedRecord>, StoreError> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| StoreError::LockPoisoned("get_by_id"))?;
            if let Some(record) = cache.get(id) {
                return Ok(Some(record.clone()));
            }
        }

        let record = self.store.get_by_id(id)?;
        if let Some(record) = &record {
            let mut cache = self
                .cache
                .write()
                .map_err(|_| StoreError::LockPoisoned("get_by_id"))?;
            cache.insert(record.id.clone(), record.clone());
        }
        Ok(record)
    }

    pub fn get_all(&self) -> Result<Vec<IngestedRecord>, StoreError> {
        self.store.get_all()
    }

    pub fn get_by_partner(&self, partner_id: &str) -> Result<Vec<IngestedRecord>, StoreError> {
        self.store.get_by_partner(partner_id)
    }

    /// Whether a record is already served from the cache.
    pub fn is_warm(&self, id: &str) -> bool {
        self.cache.read().map(|c| c.contains_key(id)).unwrap_or(false)
    }
}

fn warm_cache(
    store: &Arc<dyn RecordStore>,
    cache: &Arc<RwLock<HashMap<String, IngestedRecord>>>,
    ingested: &RecordIngested,
) -> Result<(), HandlerError> {
    let Some(record) = store.get_by_id(&ingested.record_id)? else {
        tracing::warn!(record_id = %ingested.record_id, "ingested record missing from store");
        return Ok(());
    };

    let mut cache = cache
        .write()
        .map_err(|_| Box::new(StoreError::LockPoisoned("warm_cache")) as HandlerError)?;
    cache.insert(record.id.clone(), record);
    tracing::debug!(record_id = %ingested.record_id, "cache warmed");
    Ok(())
}
