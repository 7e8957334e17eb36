use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use docstore::Cursor;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::virtual_machine::*;
use crate::state::AppState;

fn vm_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("VM {id} not found"))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Virtual Machines",
    operation_id = "listVms",
    summary = "List virtual machines",
    description = "Lists every VM, optionally filtered by `status`. Supplying `limit` or `cursor` returns one page in id order together with the cursor for the next page.",
    params(VmListQuery),
    responses(
        (status = 200, description = "Virtual machines", body = VmListResponse),
        (status = 400, description = "Invalid limit or cursor (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query), fields(status = ?query.status))]
pub async fn list_vms(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<VmListQuery>,
) -> Result<Json<VmListResponse>, AppError> {
    if !query.is_paginated() {
        let vms = match query.status {
            Some(status) => state.vms.get_by_status(status).await?,
            None => state.vms.list_all().await?,
        };
        return Ok(Json(VmListResponse {
            items: vms.into_iter().map(VmResponse::from).collect(),
            next_cursor: None,
        }));
    }

    let size = query.page_size()?;
    let cursor = query.cursor.as_deref().map(Cursor::decode).transpose()?;
    let page = match query.status {
        Some(status) => state.vms.page_by_status(status, size, cursor.as_ref()).await?,
        None => state.vms.page(size, cursor.as_ref()).await?,
    };

    let next_cursor = if page.items.len() == size {
        page.next_cursor.map(|c| c.encode())
    } else {
        None
    };
    Ok(Json(VmListResponse {
        items: page.items.into_iter().map(VmResponse::from).collect(),
        next_cursor,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Virtual Machines",
    operation_id = "createVm",
    summary = "Register a virtual machine",
    description = "Creates a VM with an empty metric history. An id is generated when `vm_id` is omitted; an existing VM with the same id is replaced.",
    request_body = CreateVmRequest,
    responses(
        (status = 201, description = "VM created", body = VmResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(name = %payload.name))]
pub async fn create_vm(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateVmRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_vm(&payload)?;

    let vm = state.vms.create(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(VmResponse::from(vm))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Virtual Machines",
    operation_id = "getVm",
    summary = "Get a virtual machine",
    params(("id" = String, Path, description = "VM ID")),
    responses(
        (status = 200, description = "VM details", body = VmResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "VM not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_vm(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VmResponse>, AppError> {
    let vm = state
        .vms
        .get_by_id(&id)
        .await?
        .ok_or_else(|| vm_not_found(&id))?;
    Ok(Json(VmResponse::from(vm)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Virtual Machines",
    operation_id = "updateVm",
    summary = "Update a virtual machine",
    description = "Changes the supplied fields only. Hardware spec and metrics cannot be patched.",
    params(("id" = String, Path, description = "VM ID")),
    request_body = UpdateVmRequest,
    responses(
        (status = 200, description = "Updated VM", body = VmResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "VM not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload))]
pub async fn update_vm(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateVmRequest>,
) -> Result<Json<VmResponse>, AppError> {
    if payload.is_empty() {
        return Err(AppError::Validation("No fields to update".into()));
    }

    let vm = state.vms.update(&id, payload.into()).await?;
    Ok(Json(VmResponse::from(vm)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Virtual Machines",
    operation_id = "deleteVm",
    summary = "Delete a virtual machine",
    params(("id" = String, Path, description = "VM ID")),
    responses(
        (status = 204, description = "VM deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "VM not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn delete_vm(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.vms.get_by_id(&id).await?.is_none() {
        return Err(vm_not_found(&id));
    }
    state.vms.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/metrics",
    tag = "Virtual Machines",
    operation_id = "recordVmMetrics",
    summary = "Record a utilization sample",
    description = "Overwrites the live gauges and appends the sample to the 20-sample history window.",
    params(("id" = String, Path, description = "VM ID")),
    request_body = MetricsRequest,
    responses(
        (status = 200, description = "VM with updated metrics", body = VmResponse),
        (status = 400, description = "Usage outside 0-100 (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "VM not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Concurrent updates kept conflicting (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload))]
pub async fn record_metrics(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<MetricsRequest>,
) -> Result<Json<VmResponse>, AppError> {
    let vm = state.vms.update_metrics(&id, payload.into()).await?;
    Ok(Json(VmResponse::from(vm)))
}
