use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Provider;
use crate::error::AppError;

/// Request body for provider registration. The credential travels in the
/// `Authorization` header.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Display name (1-128 characters).
    #[schema(example = "Ada's Rack")]
    pub name: String,
    /// Contact email. Defaults to the identity provider's email claim.
    #[schema(example = "ada@example.com")]
    #[serde(default)]
    pub email: Option<String>,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > 128 {
        return Err(AppError::Validation("Name must be 1-128 characters".into()));
    }
    let email = payload.email.as_deref().map(str::trim).unwrap_or_default();
    if !email.is_empty() && !email.contains('@') {
        return Err(AppError::Validation("Email must contain '@'".into()));
    }
    Ok(())
}

/// A provider account.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProviderResponse {
    /// Internal provider id.
    #[schema(example = "0b6f4c9e-4f0a-4f5b-9a43-5d3f9a1c2b7e")]
    pub id: String,
    #[schema(example = "Ada's Rack")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Identity provider subject id.
    #[schema(example = "u_8fj2k1")]
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl From<Provider> for ProviderResponse {
    fn from(provider: Provider) -> Self {
        Self {
            id: provider.id,
            name: provider.name,
            email: provider.email,
            subject_id: provider.subject_id,
            created_at: provider.created_at,
            last_login: provider.last_login,
        }
    }
}
