use thiserror::Error;

/// Errors surfaced by the document store and the repositories built on it.
///
/// Absence of a document is never an error; lookups return `Option`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid document id '{0}'")]
    InvalidDocumentId(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid pagination cursor")]
    InvalidCursor,

    #[error("Entity must serialize to a JSON object, got {0}")]
    NotADocument(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction aborted by a conflicting write")]
    Aborted,

    #[error("Transaction gave up after {attempts} attempts")]
    TransactionExhausted { attempts: u8 },

    #[error("Invalid transaction use: {0}")]
    InvalidTransaction(String),

    #[error("No repository registered for {0}")]
    Unregistered(&'static str),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "sea-orm")]
impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        StoreError::Backend(err.to_string())
    }
}
