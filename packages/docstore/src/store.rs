use async_trait::async_trait;

use crate::document::{Document, Snapshot};
use crate::error::StoreError;
use crate::query::Query;

/// How a `set` combines with the document already stored under the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace the whole document.
    #[default]
    Overwrite,
    /// Deep-merge into the existing document, creating it if absent.
    Merge,
}

/// Schemaless document store organised as named collections.
///
/// Documents are JSON objects addressed by `(collection, id)`. Every backend
/// must provide snapshot reads inside transactions and reject commits whose
/// read set was modified concurrently.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. Absence is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Insert a document under a freshly generated id and return that id.
    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError>;

    /// Create or replace a document under a caller-chosen id.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError>;

    /// Remove a document. Deleting a missing id succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Run a query against one collection.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Snapshot>, StoreError>;

    /// Every document in a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Snapshot>, StoreError> {
        self.query(collection, &Query::new()).await
    }

    /// Open an optimistic transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// Backend half of a transaction.
///
/// Reads go through to the store and record the version seen; writes are
/// buffered until [`StoreTransaction::commit`], which fails with
/// [`StoreError::Aborted`] when any recorded version changed.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError>;

    fn set(
        &mut self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError>;

    fn delete(&mut self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
