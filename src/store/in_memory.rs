//! In-memory record store for testing and single-process scenarios.

use std::sync::{Arc, RwLock};

use super::record::IngestedRecord;
use super::record_store::{RecordStore, StoreError};

/// Vec-backed record store. Clone-friendly via `Arc`; scans preserve
/// insertion order.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<IngestedRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryRecordStore {
    fn add(&self, record: IngestedRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned("add"))?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.push(record);
        Ok(())
    }

    fn update(&self, record: IngestedRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::LockPoisoned("update"))?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    fn get_by_id(&self, id: &str) -> Result<Option<IngestedRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned("get_by_id"))?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn get_all(&self) -> Result<Vec<IngestedRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned("get_all"))?;
        Ok(records.clone())
    }

    fn get_by_partner(&self, partner_id: &str) -> Result<Vec<IngestedRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::LockPoisoned("get_by_partner"))?;
        Ok(records
            .iter()
            .filter(|r| r.partner_id == partner_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_and_get() {
        let store = InMemoryRecordStore::new();
        let record = IngestedRecord::with_id("r1", "p1", json!({"age": 30}));

        store.add(record.clone()).unwrap();

        assert_eq!(store.get_by_id("r1").unwrap(), Some(record));
        assert!(store.get_by_id("r2").unwrap().is_none());
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let store = InMemoryRecordStore::new();
        store
            .add(IngestedRecord::with_id("r1", "p1", json!({})))
            .unwrap();

        let err = store
            .add(IngestedRecord::with_id("r1", "p2", json!({})))
            .unwrap_err();
        assert_eq!(err, StoreError::Duplicate("r1".into()));
    }

    #[test]
    fn update_replaces_or_fails() {
        let store = InMemoryRecordStore::new();
        store
            .add(IngestedRecord::with_id("r1", "p1", json!({"age": 30})))
            .unwrap();

        let updated = IngestedRecord::with_id("r1", "p1", json!({"age": 31}));
        store.update(updated.clone()).unwrap();
        assert_eq!(store.get_by_id("r1").unwrap(), Some(updated));

        let err = store
            .update(IngestedRecord::with_id("r9", "p1", json!({})))
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("r9".into()));
    }

    #[test]
    fn partner_scans_preserve_insertion_order() {
        let store = InMemoryRecordStore::new();
        store.add(IngestedRecord::with_id("r1", "p1", json!({}))).unwrap();
        store.add(IngestedRecord::with_id("r2", "p2", json!({}))).unwrap();
        store.add(IngestedRecord::with_id("r3", "p1", json!({}))).unwrap();

        let ids: Vec<_> = store
            .get_by_partner("p1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r1", "r3"]);
        assert_eq!(store.get_all().unwrap().len(), 3);
    }
}
