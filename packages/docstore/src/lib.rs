//! Typed document repositories over a pluggable document store.
//!
//! A [`DocumentStore`] holds schemaless JSON documents in named collections.
//! [`DocumentRepository`] layers typed CRUD, equality queries, cursor
//! pagination and optimistic transactions on top of it, and
//! [`RepositoryRegistry`] wires one repository per entity type at startup.

pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod registry;
pub mod repository;
pub mod store;
pub mod transaction;

#[cfg(feature = "sea-orm")]
pub mod database;

pub use document::{Document, Snapshot};
pub use error::StoreError;
pub use memory::MemoryDocumentStore;
pub use query::{Cursor, Direction, FilterOp, Query};
pub use registry::{Binding, RepositoryRegistry};
pub use repository::{DocumentRepository, Entity, IdRule, Page};
pub use store::{DocumentStore, StoreTransaction, WriteMode};
pub use transaction::{Transaction, run_transaction};

#[cfg(feature = "sea-orm")]
pub use database::DatabaseDocumentStore;
