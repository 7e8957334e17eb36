use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;

/// Provider identity extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require a verified credential.
pub struct AuthUser {
    pub subject_id: String,
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::TokenMissing)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AppError::TokenInvalid)?;
    if token.is_empty() {
        return Err(AppError::TokenMissing);
    }
    Ok(token)
}

/// Raw bearer credential, not yet verified.
///
/// Used by the account endpoints, which verify the credential themselves.
pub struct BearerCredential(pub String);

impl<S> FromRequestParts<S> for BearerCredential
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(parts).map(|token| BearerCredential(token.to_string()))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let identity = state.identity.verify(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Credential rejected");
            AppError::from(e)
        })?;

        Ok(AuthUser {
            subject_id: identity.subject_id,
        })
    }
}
