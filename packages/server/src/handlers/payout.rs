use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::payout::*;
use crate::state::AppState;

fn payout_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Payout {id} not found"))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Payouts",
    operation_id = "listPayouts",
    summary = "List payouts",
    params(PayoutListQuery),
    responses(
        (status = 200, description = "Payouts", body = Vec<PayoutResponse>),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query), fields(status = ?query.status))]
pub async fn list_payouts(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PayoutListQuery>,
) -> Result<Json<Vec<PayoutResponse>>, AppError> {
    let payouts = match query.status {
        Some(status) => state.payouts.get_by_status(status).await?,
        None => state.payouts.list_all().await?,
    };
    Ok(Json(payouts.into_iter().map(PayoutResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Payouts",
    operation_id = "createPayout",
    summary = "Record a payout",
    description = "Creates a `Pending` payout dated now.",
    request_body = CreatePayoutRequest,
    responses(
        (status = 201, description = "Payout created", body = PayoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(method = %payload.method))]
pub async fn create_payout(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePayoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payout = state.payouts.create(payload.amount, &payload.method).await?;
    Ok((StatusCode::CREATED, Json(PayoutResponse::from(payout))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Payouts",
    operation_id = "getPayout",
    summary = "Get a payout",
    params(("id" = String, Path, description = "Payout ID")),
    responses(
        (status = 200, description = "Payout details", body = PayoutResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Payout not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_payout(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PayoutResponse>, AppError> {
    let payout = state
        .payouts
        .get_by_id(&id)
        .await?
        .ok_or_else(|| payout_not_found(&id))?;
    Ok(Json(PayoutResponse::from(payout)))
}

#[utoipa::path(
    patch,
    path = "/{id}/status",
    tag = "Payouts",
    operation_id = "updatePayoutStatus",
    summary = "Advance a payout's status",
    description = "Statuses only move forward: `Pending` to `Processing`, `Completed` or `Failed`, and `Processing` to `Completed` or `Failed`. Re-applying the current status is a no-op.",
    params(("id" = String, Path, description = "Payout ID")),
    request_body = UpdatePayoutStatusRequest,
    responses(
        (status = 200, description = "Updated payout", body = PayoutResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Payout not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Transition not allowed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(status = %payload.status))]
pub async fn update_payout_status(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdatePayoutStatusRequest>,
) -> Result<Json<PayoutResponse>, AppError> {
    let payout = state.payouts.update_status(&id, payload.status).await?;
    Ok(Json(PayoutResponse::from(payout)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Payouts",
    operation_id = "deletePayout",
    summary = "Delete a payout",
    params(("id" = String, Path, description = "Payout ID")),
    responses(
        (status = 204, description = "Payout deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Payout not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_payout(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.payouts.get_by_id(&id).await?.is_none() {
        return Err(payout_not_found(&id));
    }
    state.payouts.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
