//! Admin record endpoints. Same verbs and access rules as users; admins are
//! local accounts.

use super::records::{self, RegisterRequest, StatusRequest, UpdateRequest};
use crate::{
    account::{Account, AccountKind},
    api::{
        envelope::{ErrorBody, Success},
        error::ApiError,
        payload::Payload,
        session::require_admin,
        state::AppState,
    },
};
use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
};
use std::sync::Arc;
use tracing::info;

const KIND: AccountKind = AccountKind::Admin;

#[utoipa::path(
    get,
    path = "/admins",
    responses(
        (status = 200, description = "All admins.", body = [Account]),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn index(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Success<Vec<Account>>, ApiError> {
    require_admin(&headers, &state).await?;
    Ok(Success::data(records::list(&state, KIND).await?))
}

#[utoipa::path(
    post,
    path = "/admins",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin created as pending.", body = Account),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 422, description = "Validation failed or name/email already taken.", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn store(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<RegisterRequest>,
) -> Result<Success<Account>, ApiError> {
    require_admin(&headers, &state).await?;
    let admin = records::create_admin(&state, request).await?;
    let message = format!("Admin with ID {} was successfully created", admin.id);
    Ok(Success::created(admin).with_message(message))
}

#[utoipa::path(
    get,
    path = "/admins/{id}",
    params(
        ("id" = String, Path, description = "Admin id")
    ),
    responses(
        (status = 200, description = "Admin detail.", body = Account),
        (status = 404, description = "Admin not found.", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn show(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Success<Account>, ApiError> {
    Ok(Success::data(records::find(&state, KIND, &id).await?))
}

#[utoipa::path(
    put,
    path = "/admins/{id}",
    params(
        ("id" = String, Path, description = "Admin id")
    ),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Admin updated.", body = Account),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 404, description = "Admin not found.", body = ErrorBody),
        (status = 422, description = "Validation failed or name/email already taken.", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn update(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<UpdateRequest>,
) -> Result<Success<Account>, ApiError> {
    require_admin(&headers, &state).await?;
    Ok(Success::data(
        records::update(&state, KIND, &id, request).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/admins/{id}",
    params(
        ("id" = String, Path, description = "Admin id")
    ),
    responses(
        (status = 200, description = "Admin deleted; its sessions go with it."),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 404, description = "Admin not found.", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn destroy(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Success<()>, ApiError> {
    require_admin(&headers, &state).await?;
    records::destroy(&state, KIND, &id).await?;
    Ok(Success::message(format!(
        "Admin with ID {id} was successfully deleted"
    )))
}

#[utoipa::path(
    post,
    path = "/auth/admin/{id}/status",
    params(
        ("id" = String, Path, description = "Admin id")
    ),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed."),
        (status = 400, description = "Status token is invalid or missing.", body = ErrorBody),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 404, description = "Admin not found.", body = ErrorBody),
    ),
    tag = "admins"
)]
pub async fn change_status(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<StatusRequest>,
) -> Result<Success<()>, ApiError> {
    let principal = require_admin(&headers, &state).await?;
    let admin = records::change_status(&state, KIND, &id, request).await?;
    info!(admin.id = %principal.admin.id, target.id = %admin.id, status = %admin.status, "admin status set");
    Ok(Success::message(format!(
        "Status for the admin with ID {} set to {}",
        admin.id, admin.status
    )))
}
