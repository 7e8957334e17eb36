//! Relational backend on sea-orm.
//!
//! Every collection shares one `document` table keyed by
//! `(collection, doc_id)`; payloads are stored as JSON. Transactions are
//! optimistic: reads record the row version, and commit re-reads each of
//! them under a database transaction (row-locked where the backend supports
//! it) before applying buffered writes.

pub mod entity;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::document::{
    Document, Snapshot, generate_document_id, resolve_write, validate_document_id,
};
use crate::error::StoreError;
use crate::query::Query;
use crate::store::{DocumentStore, StoreTransaction, WriteMode};
use crate::transaction::{PendingWrite, TransactionBuffer};
use entity::document;

/// Attempts at drawing a free generated id before giving up.
const ADD_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct DatabaseDocumentStore {
    db: DatabaseConnection,
}

impl DatabaseDocumentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a pool and make sure the `document` table exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let mut opt = ConnectOptions::new(url.to_owned());
        opt.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let store = Self::new(Database::connect(opt).await?);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.db
            .get_schema_registry("docstore::database::entity::*")
            .sync(&self.db)
            .await?;
        Ok(())
    }

    async fn try_set(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        let existing = load(&txn, collection, id, true).await?;
        apply_write(&txn, collection, id, existing, PendingWrite::Set { data, mode }).await?;
        txn.commit().await?;
        Ok(())
    }
}

async fn load<C: ConnectionTrait>(
    conn: &C,
    collection: &str,
    id: &str,
    for_update: bool,
) -> Result<Option<document::Model>, StoreError> {
    let mut select = document::Entity::find_by_id((collection.to_string(), id.to_string()));
    // SQLite serializes writers itself and has no FOR UPDATE.
    if for_update && conn.get_database_backend() != DbBackend::Sqlite {
        select = select.lock(LockType::Update);
    }
    Ok(select.one(conn).await?)
}

fn to_snapshot(model: document::Model) -> Result<Snapshot, StoreError> {
    match model.data {
        Value::Object(data) => Ok(Snapshot::new(model.doc_id, data, model.version as u64)),
        _ => Err(StoreError::Backend(format!(
            "stored document {}/{} is not an object",
            model.collection, model.doc_id
        ))),
    }
}

/// Versions are microsecond timestamps, bumped past the previous one on clock skew.
fn next_version(previous: Option<i64>) -> i64 {
    let now = Utc::now().timestamp_micros();
    previous.map_or(now, |v| now.max(v + 1))
}

fn conflict_or_backend(err: DbErr) -> StoreError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        StoreError::Aborted
    } else {
        err.into()
    }
}

async fn apply_write<C: ConnectionTrait>(
    conn: &C,
    collection: &str,
    id: &str,
    existing: Option<document::Model>,
    write: PendingWrite,
) -> Result<(), StoreError> {
    let (data, mode) = match write {
        PendingWrite::Delete => {
            document::Entity::delete_by_id((collection.to_string(), id.to_string()))
                .exec(conn)
                .await?;
            return Ok(());
        }
        PendingWrite::Set { data, mode } => (data, mode),
    };

    let now = Utc::now();
    match existing {
        Some(current) => {
            let previous = match current.data {
                Value::Object(map) => Some(map),
                _ => None,
            };
            let resolved = resolve_write(previous, data, mode);
            document::Entity::update_many()
                .col_expr(document::Column::Data, Expr::value(Value::Object(resolved)))
                .col_expr(
                    document::Column::Version,
                    Expr::value(next_version(Some(current.version))),
                )
                .col_expr(document::Column::UpdatedAt, Expr::value(now))
                .filter(document::Column::Collection.eq(collection))
                .filter(document::Column::DocId.eq(id))
                .exec(conn)
                .await?;
        }
        None => {
            let model = document::ActiveModel {
                collection: Set(collection.to_string()),
                doc_id: Set(id.to_string()),
                data: Set(Value::Object(data)),
                version: Set(next_version(None)),
                created_at: Set(now),
                updated_at: Set(now),
            };
            document::Entity::insert(model)
                .exec_without_returning(conn)
                .await
                .map_err(conflict_or_backend)?;
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for DatabaseDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        validate_document_id(id)?;
        load(&self.db, collection, id, false)
            .await?
            .map(to_snapshot)
            .transpose()
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        for _ in 0..ADD_ATTEMPTS {
            let id = generate_document_id();
            match apply_write(&self.db, collection, &id, None, PendingWrite::Set {
                data: data.clone(),
                mode: WriteMode::Overwrite,
            })
            .await
            {
                Ok(()) => return Ok(id),
                Err(StoreError::Aborted) => {
                    debug!(collection, id = %id, "Generated id already taken")
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Backend("could not allocate a free document id".to_string()))
    }

    #[instrument(skip(self, data))]
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Document,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        validate_document_id(id)?;
        // A concurrent first write may win the insert; the second pass then updates.
        match self.try_set(collection, id, data.clone(), mode).await {
            Err(StoreError::Aborted) => self.try_set(collection, id, data, mode).await,
            other => other,
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        validate_document_id(id)?;
        document::Entity::delete_by_id((collection.to_string(), id.to_string()))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Snapshot>, StoreError> {
        let mut select = document::Entity::find()
            .filter(document::Column::Collection.eq(collection))
            .order_by_asc(document::Column::DocId);

        // Plain id-ordered pages push cursor and limit into SQL and keep the
        // database's collation order, so `doc_id > cursor` continues exactly
        // where the previous page ended. Anything else is evaluated over the
        // whole collection.
        let id_scan = query.is_id_scan();
        if id_scan {
            query.check_cursor()?;
            if let Some(cursor) = query.cursor() {
                select = select.filter(document::Column::DocId.gt(cursor.id()));
            }
            if let Some(limit) = query.max_results() {
                select = select.limit(limit as u64);
            }
        }

        let rows = select
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_snapshot)
            .collect::<Result<Vec<_>, _>>()?;
        if id_scan {
            Ok(rows)
        } else {
            query.apply(rows)
        }
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(SqlTransaction {
            db: self.db.clone(),
            buffer: TransactionBuffer::default(),
        }))
    }
}

struct SqlTransaction {
    db: DatabaseConnection,
    buffer: TransactionBuffer,
}

#[async_trait]
impl StoreTransaction for SqlTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError> {
        if let Some(seen) = self.buffer.cached(collection, id)? {
            return Ok(seen);
        }
        let snapshot = load(&self.db, collection, id, false)
            .await?
            .map(to_snapshot)
            .transpose()?;
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
        let SqlTransaction { db, buffer } = *self;
        let txn = db.begin().await?;

        for (key, seen) in buffer.read_versions() {
            let current = load(&txn, &key.collection, &key.id, true)
                .await?
                .map(|model| model.version as u64);
            if current != seen {
                txn.rollback().await?;
                return Err(StoreError::Aborted);
            }
        }

        for (key, write) in buffer.into_writes() {
            let existing = load(&txn, &key.collection, &key.id, true).await?;
            apply_write(&txn, &key.collection, &key.id, existing, write).await?;
        }

        txn.commit().await?;
        Ok(())
    }
}
