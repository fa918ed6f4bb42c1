//! User record endpoints.
//!
//! `show` is public; everything else needs an admin bearer session. Creation
//! goes through the same provider registration flow as self sign-up.

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

const KIND: AccountKind = AccountKind::User;

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users.", body = [Account]),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
    ),
    tag = "users"
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
    path = "/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered with the identity provider and stored as pending.", body = Account),
        (status = 400, description = "Identity provider rejected the registration.", body = ErrorBody),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 422, description = "Validation failed or name/email already taken.", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn store(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<RegisterRequest>,
) -> Result<Success<Account>, ApiError> {
    require_admin(&headers, &state).await?;
    let user = records::register_user(&state, request).await?;
    let message = format!("User with ID {} was successfully created", user.id);
    Ok(Success::created(user).with_message(message))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User id (identity provider subject)")
    ),
    responses(
        (status = 200, description = "User detail.", body = Account),
        (status = 404, description = "User not found.", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn show(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Success<Account>, ApiError> {
    Ok(Success::data(records::find(&state, KIND, &id).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "User updated.", body = Account),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 404, description = "User not found.", body = ErrorBody),
        (status = 422, description = "Validation failed or name/email already taken.", body = ErrorBody),
    ),
    tag = "users"
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
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User deleted."),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 404, description = "User not found.", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn destroy(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Success<()>, ApiError> {
    require_admin(&headers, &state).await?;
    records::destroy(&state, KIND, &id).await?;
    Ok(Success::message(format!(
        "User with ID {id} was successfully deleted"
    )))
}

#[utoipa::path(
    post,
    path = "/auth/user/{id}/status",
    params(
        ("id" = String, Path, description = "User id")
    ),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed."),
        (status = 400, description = "Status token is invalid or missing.", body = ErrorBody),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
        (status = 404, description = "User not found.", body = ErrorBody),
    ),
    tag = "users"
)]
pub async fn change_status(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<StatusRequest>,
) -> Result<Success<()>, ApiError> {
    let principal = require_admin(&headers, &state).await?;
    let user = records::change_status(&state, KIND, &id, request).await?;
    info!(admin.id = %principal.admin.id, user.id = %user.id, status = %user.status, "user status set");
    Ok(Success::message(format!(
        "Status for the user with ID {} set to {}",
        user.id, user.status
    )))
}
