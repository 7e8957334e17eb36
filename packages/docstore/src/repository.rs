use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use common::RetryPolicy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::document::{Snapshot, generate_document_id, to_document};
use crate::error::StoreError;
use crate::query::{Cursor, Query};
use crate::store::{DocumentStore, WriteMode};
use crate::transaction::{Transaction, run_transaction};

/// A type persisted as one document per instance.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Default collection name.
    const COLLECTION: &'static str;

    /// Persisted top-level field names; the only fields `where_equal` accepts.
    const FIELDS: &'static [&'static str];

    /// Called after every read with the document id. Entities whose key is
    /// not part of their payload store it here.
    fn assign_document_id(&mut self, _id: &str) {}
}

/// Derives the document id from an entity, replacing store-generated ids.
pub type IdRule<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// One page of results plus the cursor to resume after it.
///
/// `next_cursor` is `None` only when the page is empty. A page shorter than
/// the requested size marks the end of the data.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

/// Typed access to one collection.
///
/// Holds no entity state: every call goes to the underlying store. Cloning is
/// cheap and clones share the store.
pub struct DocumentRepository<T: Entity> {
    store: Arc<dyn DocumentStore>,
    collection: Arc<str>,
    id_rule: Option<IdRule<T>>,
    retry: RetryPolicy,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: Arc::clone(&self.collection),
            id_rule: self.id_rule.clone(),
            retry: self.retry,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> DocumentRepository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            collection: Arc::from(T::COLLECTION),
            id_rule: None,
            retry: RetryPolicy::default(),
            _entity: PhantomData,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<Arc<str>>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_id_rule(mut self, rule: IdRule<T>) -> Self {
        self.id_rule = Some(rule);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn has_id_rule(&self) -> bool {
        self.id_rule.is_some()
    }

    fn decode(snapshot: Snapshot) -> Result<T, StoreError> {
        let id = snapshot.id().to_string();
        let mut entity: T = snapshot.into_entity()?;
        entity.assign_document_id(&id);
        Ok(entity)
    }

    fn decode_all(rows: Vec<Snapshot>) -> Result<Vec<T>, StoreError> {
        rows.into_iter().map(Self::decode).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(&self.collection, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    /// Every document in the collection. Meant for small collections.
    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        Self::decode_all(self.store.list(&self.collection).await?)
    }

    /// Persist a new entity and return its id.
    ///
    /// With an id rule the document is written at `rule(entity)`, replacing
    /// whatever is stored there. Callers that need uniqueness must check first.
    #[instrument(skip_all, fields(collection = %self.collection))]
    pub async fn create(&self, entity: &T) -> Result<String, StoreError> {
        let data = to_document(entity)?;
        let id = match &self.id_rule {
            Some(rule) => {
                let id = rule(entity);
                self.store
                    .set(&self.collection, &id, data, WriteMode::Overwrite)
                    .await?;
                id
            }
            None => self.store.add(&self.collection, data).await?,
        };
        debug!(id = %id, "Created document");
        Ok(id)
    }

    /// Merge-write `entity` at `id`. Fields absent from the serialized entity
    /// keep their stored values; a missing document is created.
    pub async fn update(&self, id: &str, entity: &T) -> Result<(), StoreError> {
        self.merge(id, entity).await
    }

    /// Merge an arbitrary partial payload into the document at `id`.
    #[instrument(skip_all, fields(collection = %self.collection, id = %id))]
    pub async fn merge<P>(&self, id: &str, patch: &P) -> Result<(), StoreError>
    where
        P: Serialize + ?Sized + Sync,
    {
        let data = to_document(patch)?;
        self.store
            .set(&self.collection, id, data, WriteMode::Merge)
            .await
    }

    /// Remove the document at `id`; succeeds when it does not exist.
    #[instrument(skip_all, fields(collection = %self.collection, id = %id))]
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(&self.collection, id).await
    }

    /// Documents whose `field` equals `value` exactly.
    pub async fn where_equal(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<T>, StoreError> {
        let root = field.split('.').next().unwrap_or(field);
        if !T::FIELDS.contains(&root) {
            return Err(StoreError::InvalidQuery(format!(
                "unknown field '{field}' in collection '{}'",
                self.collection
            )));
        }
        let query = Query::new().where_eq(field, value);
        Self::decode_all(self.store.query(&self.collection, &query).await?)
    }

    /// First document of the refined collection query, if any.
    pub async fn first_matching<F>(&self, refine: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(Query) -> Query + Send,
    {
        let query = refine(Query::new()).limit(1);
        self.store
            .query(&self.collection, &query)
            .await?
            .into_iter()
            .next()
            .map(Self::decode)
            .transpose()
    }

    /// Up to `size` documents in id order, resuming after `cursor`.
    pub async fn page(&self, size: usize, cursor: Option<&Cursor>) -> Result<Page<T>, StoreError> {
        self.page_matching(|q| q, size, cursor).await
    }

    /// Paginate a refined query. The cursor must come from a page of the
    /// same refinement, otherwise the call fails with `InvalidCursor`.
    pub async fn page_matching<F>(
        &self,
        refine: F,
        size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<T>, StoreError>
    where
        F: FnOnce(Query) -> Query + Send,
    {
        let base = refine(Query::new());
        let mut query = base.clone().limit(size);
        if let Some(cursor) = cursor {
            query = query.start_after(cursor.clone());
        }

        let rows = self.store.query(&self.collection, &query).await?;
        let next_cursor = rows.last().map(|last| base.cursor_for(last));
        Ok(Page {
            items: Self::decode_all(rows)?,
            next_cursor,
        })
    }

    /// Run `body` in a store transaction with this repository's retry policy.
    ///
    /// The body may be invoked several times and must not have side effects
    /// outside the transaction.
    pub async fn run_transaction<F, Fut, R, E>(&self, body: F) -> Result<R, E>
    where
        F: FnMut(Transaction) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<StoreError>,
    {
        run_transaction(self.store.as_ref(), &self.retry, body).await
    }

    pub async fn get_in(&self, tx: &Transaction, id: &str) -> Result<Option<T>, StoreError> {
        tx.get(&self.collection, id).await?.map(Self::decode).transpose()
    }

    /// Buffer a full overwrite of the document at `id`.
    pub async fn set_in(&self, tx: &Transaction, id: &str, entity: &T) -> Result<(), StoreError> {
        tx.set(&self.collection, id, to_document(entity)?, WriteMode::Overwrite)
            .await
    }

    /// Buffer the creation of `entity` and return the id it will get.
    pub async fn create_in(&self, tx: &Transaction, entity: &T) -> Result<String, StoreError> {
        let id = match &self.id_rule {
            Some(rule) => rule(entity),
            None => generate_document_id(),
        };
        self.set_in(tx, &id, entity).await?;
        Ok(id)
    }

    pub async fn update_in<P>(
        &self,
        tx: &Transaction,
        id: &str,
        patch: &P,
    ) -> Result<(), StoreError>
    where
        P: Serialize + ?Sized + Sync,
    {
        tx.set(&self.collection, id, to_document(patch)?, WriteMode::Merge)
            .await
    }

    pub async fn delete_in(&self, tx: &Transaction, id: &str) -> Result<(), StoreError> {
        tx.delete(&self.collection, id).await
    }
}
