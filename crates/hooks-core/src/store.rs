//! Record Storage
//!
//! The storage trait the hooks talk to, an in-memory implementation and a
//! timeout decorator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::record::Record;

/// Record storage trait (Strategy pattern)
///
/// Implement this for each backend the hooks can run against.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a record by collection and id
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>>;

    /// Create a new record. Fails with `Conflict` if the id is taken.
    async fn insert(&self, record: &Record) -> Result<Record>;

    /// Persist changes to an existing record
    async fn save(&self, record: &Record) -> Result<()>;

    /// All records of a collection
    async fn list(&self, collection: &str) -> Result<Vec<Record>>;

    /// Backend name
    fn name(&self) -> &str;
}

type RecordKey = (String, String);

/// In-memory record store (for development and tests)
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordKey, Record>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.records
            .read()
            .map(|records| records.keys().filter(|(c, _)| c == collection).count())
            .unwrap_or(0)
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("record map lock poisoned".into())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(&(collection.to_string(), id.to_string())).cloned())
    }

    async fn insert(&self, record: &Record) -> Result<Record> {
        let mut stored = record.clone();
        stored.ensure_id();

        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let key = (stored.collection.clone(), stored.id.clone());
        if records.contains_key(&key) {
            return Err(StoreError::Conflict {
                collection: key.0,
                id: key.1,
            });
        }
        records.insert(key, stored.clone());

        Ok(stored)
    }

    async fn save(&self, record: &Record) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let key = (record.collection.clone(), record.id.clone());
        match records.get_mut(&key) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                collection: key.0,
                id: key.1,
            }),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        let mut items: Vec<Record> = records
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, record)| record.clone())
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Bounds every call of the wrapped store by a deadline
pub struct TimeoutStore {
    inner: Arc<dyn RecordStore>,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn RecordStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, call: impl std::future::Future<Output = Result<T>> + Send) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl RecordStore for TimeoutStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        self.bounded(self.inner.get(collection, id)).await
    }

    async fn insert(&self, record: &Record) -> Result<Record> {
        self.bounded(self.inner.insert(record)).await
    }

    async fn save(&self, record: &Record) -> Result<()> {
        self.bounded(self.inner.save(record)).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>> {
        self.bounded(self.inner.list(collection)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
