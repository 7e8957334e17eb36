use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, BearerCredential};
use crate::extractors::json::AppJson;
use crate::models::auth::{ProviderResponse, RegisterRequest, validate_register_request};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a provider",
    description = "Creates the provider account for the subject of the bearer credential. Fails with `CONFLICT` if the subject is already registered.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Provider registered", body = ProviderResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Already registered (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, credential, payload), fields(name = %payload.name))]
pub async fn register(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let provider = state
        .accounts
        .register(&payload.name, &credential, email)
        .await?;

    Ok((StatusCode::CREATED, Json(ProviderResponse::from(provider))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in as a registered provider",
    description = "Verifies the bearer credential, refreshes the provider's last-login time and returns the provider.",
    responses(
        (status = 200, description = "Logged in", body = ProviderResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not registered (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, credential))]
pub async fn login(
    State(state): State<AppState>,
    BearerCredential(credential): BearerCredential,
) -> Result<Json<ProviderResponse>, AppError> {
    let provider = state.accounts.authenticate(&credential).await?;
    Ok(Json(ProviderResponse::from(provider)))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentProvider",
    summary = "Get the current provider",
    responses(
        (status = 200, description = "Current provider", body = ProviderResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not registered (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(subject_id = %auth_user.subject_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProviderResponse>, AppError> {
    let provider = state.accounts.current(&auth_user.subject_id).await?;
    Ok(Json(ProviderResponse::from(provider)))
}
