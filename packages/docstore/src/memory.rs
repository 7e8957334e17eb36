use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::document::{
    Document, Snapshot, generate_document_id, resolve_write, validate_document_id,
};
use crate::error::StoreError;
use crate::query::Query;
use crate::store::{DocumentStore, StoreTransaction, WriteMode};
use crate::transaction::{PendingWrite, TransactionBuffer};

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Document,
    version: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, BTreeMap<String, StoredDocument>>,
    clock: u64,
}

impl MemoryState {
    fn snapshot(&self, collection: &str, id: &str) -> Option<Snapshot> {
        self.collections
            .get(collection)?
            .get(id)
            .map(|doc| Snapshot::new(id, doc.data.clone(), doc.version))
    }

    fn version_of(&self, collection: &str, id: &str) -> Option<u64> {
        self.collections.get(collection)?.get(id).map(|doc| doc.version)
    }

    fn write(&mut self, collection: &str, id: &str, data: Document, mode: WriteMode) {
        self.clock += 1;
        let version = self.clock;
        let docs = self.collections.entry(collection.to_string()).or_default();
        let existing = docs.remove(id).map(|doc| doc.data);
        docs.insert(
            id.to_string(),
            StoredDocument {
                data: resolve_write(existing, data, mode),
                version,
            },
        );
    }

    fn remove(&mut self, collection: &str, id: &str) {
        if let Some(docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

/// Process-local store. Contents vanish when the last clone is dropped.
///
/// Collections are kept sorted by id, so unfiltered scans need no sort.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state.write().map_err(|_| poisoned())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        validate_document_id(id)?;
        Ok(self.read()?.snapshot(collection, id))
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let mut state = self.write()?;
        let mut id = generate_document_id();
        while state.version_of(collection, &id).is_some() {
            id = generate_document_id();
        }
        state.write(collection, &id, data, WriteMode::Overwrite);
        Ok(id)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        validate_document_id(id)?;
        self.write()?.write(collection, id, data, mode);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        validate_document_id(id)?;
        self.write()?.remove(collection, id);
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Snapshot>, StoreError> {
        let candidates: Vec<Snapshot> = {
            let state = self.read()?;
            match state.collections.get(collection) {
                Some(docs) => docs
                    .iter()
                    .map(|(id, doc)| Snapshot::new(id.as_str(), doc.data.clone(), doc.version))
                    .collect(),
                None => Vec::new(),
            }
        };
        query.apply(candidates)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            buffer: TransactionBuffer::default(),
        }))
    }
}

struct MemoryTransaction {
    state: Arc<RwLock<MemoryState>>,
    buffer: TransactionBuffer,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        if let Some(seen) = self.buffer.cached(collection, id)? {
            return Ok(seen);
        }
        let snapshot = self.state.read().map_err(|_| poisoned())?.snapshot(collection, id);
        self.buffer.record_read(collection, id, snapshot.clone());
        Ok(snapshot)
    }

    fn set(
        &mut self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        self.buffer.push_write(collection, id, PendingWrite::Set { data, mode })
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.buffer.push_write(collection, id, PendingWrite::Delete)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { state, buffer } = *self;
        let mut state = state.write().map_err(|_| poisoned())?;

        let stale = buffer
            .read_versions()
            .any(|(key, seen)| state.version_of(&key.collection, &key.id) != seen);
        if stale {
            return Err(StoreError::Aborted);
        }

        for (key, write) in buffer.into_writes() {
            match write {
                PendingWrite::Set { data, mode } => {
                    state.write(&key.collection, &key.id, data, mode)
                }
                PendingWrite::Delete => state.remove(&key.collection, &key.id),
            }
        }
        Ok(())
    }
}
