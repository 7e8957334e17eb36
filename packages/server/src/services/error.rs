use docstore::StoreError;
use thiserror::Error;

use crate::identity::IdentityError;

/// Outcome kinds a caller can observe from a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid or expired credential")]
    AuthFailure,

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidDocumentId(id) => {
                ServiceError::Validation(format!("Invalid id '{id}'"))
            }
            StoreError::InvalidCursor => {
                ServiceError::Validation("Invalid pagination cursor".into())
            }
            StoreError::TransactionExhausted { .. } => {
                ServiceError::Conflict("Resource is being modified concurrently, try again".into())
            }
            other => ServiceError::Storage(other),
        }
    }
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredential => ServiceError::AuthFailure,
            IdentityError::Misconfigured(detail) => ServiceError::Internal(detail),
        }
    }
}

pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{what} is required")));
    }
    Ok(())
}
