use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use common::RetryPolicy;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::document::{Document, Snapshot, validate_document_id};
use crate::error::StoreError;
use crate::store::{DocumentStore, StoreTransaction, WriteMode};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DocKey {
    pub collection: String,
    pub id: String,
}

impl DocKey {
    fn new(collection: &str, id: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PendingWrite {
    Set { data: Document, mode: WriteMode },
    Delete,
}

/// Read set and write buffer shared by every backend's transaction type.
///
/// Reads are cached so repeated reads of one document observe the same
/// snapshot. Once a write is buffered, further reads are rejected.
#[derive(Debug, Default)]
pub(crate) struct TransactionBuffer {
    reads: HashMap<DocKey, Option<Snapshot>>,
    writes: Vec<(DocKey, PendingWrite)>,
}

impl TransactionBuffer {
    /// Previously read snapshot, or `None` when the document was not read yet.
    pub fn cached(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Option<Snapshot>>, StoreError> {
        if !self.writes.is_empty() {
            return Err(StoreError::InvalidTransaction(
                "all reads must happen before the first write".to_string(),
            ));
        }
        validate_document_id(id)?;
        Ok(self.reads.get(&DocKey::new(collection, id)).cloned())
    }

    pub fn record_read(&mut self, collection: &str, id: &str, snapshot: Option<Snapshot>) {
        self.reads.insert(DocKey::new(collection, id), snapshot);
    }

    pub fn push_write(
        &mut self,
        collection: &str,
        id: &str,
        write: PendingWrite,
    ) -> Result<(), StoreError> {
        validate_document_id(id)?;
        self.writes.push((DocKey::new(collection, id), write));
        Ok(())
    }

    /// Version observed for every document read; `None` means it was absent.
    pub fn read_versions(&self) -> impl Iterator<Item = (&DocKey, Option<u64>)> {
        self.reads
            .iter()
            .map(|(key, snapshot)| (key, snapshot.as_ref().map(Snapshot::version)))
    }

    pub fn into_writes(self) -> Vec<(DocKey, PendingWrite)> {
        self.writes
    }
}

/// Handle passed to transaction bodies.
///
/// Cloning shares the same underlying transaction. Using a handle after its
/// transaction finished yields [`StoreError::InvalidTransaction`].
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<Mutex<Option<Box<dyn StoreTransaction>>>>,
}

impl Transaction {
    fn new(inner: Box<dyn StoreTransaction>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(inner))),
        }
    }

    fn finished() -> StoreError {
        StoreError::InvalidTransaction("transaction already finished".to_string())
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        let mut guard = self.inner.lock().await;
        let tx = guard.as_mut().ok_or_else(Self::finished)?;
        tx.get(collection, id).await
    }

    pub async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().await;
        let tx = guard.as_mut().ok_or_else(Self::finished)?;
        tx.set(collection, id, data, mode)
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().await;
        let tx = guard.as_mut().ok_or_else(Self::finished)?;
        tx.delete(collection, id)
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let tx = self.inner.lock().await.take().ok_or_else(Self::finished)?;
        tx.commit().await
    }

    async fn discard(&self) {
        self.inner.lock().await.take();
    }
}

/// Run `body` inside an optimistic transaction, retrying on commit conflicts.
///
/// Errors returned by `body` abandon the attempt and are returned as-is.
/// A commit rejected with [`StoreError::Aborted`] reruns `body` after a
/// backoff delay until `policy` runs out of attempts, at which point the call
/// fails with [`StoreError::TransactionExhausted`].
pub async fn run_transaction<F, Fut, R, E>(
    store: &dyn DocumentStore,
    policy: &RetryPolicy,
    mut body: F,
) -> Result<R, E>
where
    F: FnMut(Transaction) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: From<StoreError>,
{
    let mut attempt: u8 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        let tx = Transaction::new(store.begin().await?);

        let value = match body(tx.clone()).await {
            Ok(value) => value,
            Err(err) => {
                tx.discard().await;
                return Err(err);
            }
        };

        match tx.commit().await {
            Ok(()) => {
                debug!(attempt, "Transaction committed");
                return Ok(value);
            }
            Err(StoreError::Aborted) if policy.allows_another(attempt) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transaction conflict, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(StoreError::Aborted) => {
                warn!(attempt, "Transaction conflict, giving up");
                return Err(StoreError::TransactionExhausted { attempts: attempt }.into());
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_commit_applies_buffered_writes() {
        let store = MemoryDocumentStore::new();
        let policy = RetryPolicy::default();

        run_transaction(&store, &policy, |tx| async move {
            assert!(tx.get("vms", "vm-1").await?.is_none());
            tx.set("vms", "vm-1", doc(json!({"name": "a"})), WriteMode::Overwrite)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap();

        let stored = store.get("vms", "vm-1").await.unwrap().unwrap();
        assert_eq!(stored.data()["name"], json!("a"));
    }

    #[tokio::test]
    async fn test_body_error_discards_writes() {
        let store = MemoryDocumentStore::new();
        let policy = RetryPolicy::default();

        let result: Result<(), StoreError> = run_transaction(&store, &policy, |tx| async move {
            tx.set("vms", "vm-1", doc(json!({"name": "a"})), WriteMode::Overwrite)
                .await?;
            Err(StoreError::InvalidQuery("stop".to_string()))
        })
        .await;

        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
        assert!(store.get("vms", "vm-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_after_write_is_rejected() {
        let store = MemoryDocumentStore::new();
        let policy = RetryPolicy::default();

        let result: Result<(), StoreError> = run_transaction(&store, &policy, |tx| async move {
            tx.set("vms", "vm-1", doc(json!({})), WriteMode::Overwrite).await?;
            tx.get("vms", "vm-1").await?;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::InvalidTransaction(_))));
    }

    #[tokio::test]
    async fn test_handle_unusable_after_commit() {
        let store = MemoryDocumentStore::new();
        let policy = RetryPolicy::default();

        let leaked = run_transaction(&store, &policy, |tx| async move { Ok::<_, StoreError>(tx) })
            .await
            .unwrap();

        assert!(matches!(
            leaked.get("vms", "vm-1").await,
            Err(StoreError::InvalidTransaction(_))
        ));
    }

    #[tokio::test]
    async fn test_persistent_conflict_exhausts_attempts() {
        let store = MemoryDocumentStore::new();
        store
            .set("counters", "c", doc(json!({"n": 0})), WriteMode::Overwrite)
            .await
            .unwrap();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        };

        let mut calls = 0;
        let result: Result<(), StoreError> = run_transaction(&store, &policy, |tx| {
            calls += 1;
            let store = store.clone();
            async move {
                tx.get("counters", "c").await?;
                // A write outside the transaction invalidates the read every time.
                store
                    .set("counters", "c", doc(json!({"n": 1})), WriteMode::Overwrite)
                    .await?;
                tx.set("counters", "c", doc(json!({"n": 2})), WriteMode::Overwrite)
                    .await?;
                Ok(())
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(StoreError::TransactionExhausted { attempts: 3 })
        ));
        assert_eq!(calls, 3);
        let stored = store.get("counters", "c").await.unwrap().unwrap();
        assert_eq!(stored.data()["n"], json!(1));
    }
}
