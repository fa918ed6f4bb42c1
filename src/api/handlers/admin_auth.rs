//! Admin authentication: local Argon2 credentials and bearer sessions.

use super::{
    records::{self, RegisterRequest},
    Validator,
};
use crate::{
    account::{normalize_email, password::verify_password, AccountKind, Status},
    api::{
        envelope::{ErrorBody, Success},
        error::ApiError,
        payload::Payload,
        session::{issue_session, require_admin, AdminSession},
        state::AppState,
    },
};
use axum::{extract::Extension, http::HeaderMap};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/admin/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin created as pending and signed in.", body = AdminSession),
        (status = 422, description = "Validation failed or name/email already taken.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<RegisterRequest>,
) -> Result<Success<AdminSession>, ApiError> {
    let admin = records::create_admin(&state, request).await?;
    let session = issue_session(&state, admin).await?;
    Ok(Success::created(session).with_message("Admin created successfully"))
}

#[utoipa::path(
    post,
    path = "/auth/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Signed in.", body = AdminSession),
        (status = 401, description = "Wrong password.", body = ErrorBody),
        (status = 403, description = "Admin is disabled.", body = ErrorBody),
        (status = 404, description = "No admin with this email.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<AdminLoginRequest>,
) -> Result<Success<AdminSession>, ApiError> {
    let mut validator = Validator::new();
    let email = normalize_email(&validator.required("email", request.email.as_deref()));
    validator.email("email", &email);
    let password = validator.required("password", request.password.as_deref());
    validator.finish()?;

    let admin = records::find_by_email(&state, AccountKind::Admin, &email).await?;

    if !verify_password(&password, &admin.password_hash) {
        return Err(ApiError::Unauthorized("Not authenticated request.".to_string()));
    }
    if admin.status == Status::Disabled {
        return Err(ApiError::Forbidden("Admin account is disabled.".to_string()));
    }

    info!(admin.id = %admin.id, "admin logged in");
    Ok(Success::data(issue_session(&state, admin).await?))
}

#[utoipa::path(
    post,
    path = "/auth/admin/logout",
    responses(
        (status = 200, description = "Session revoked."),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Success<()>, ApiError> {
    let principal = require_admin(&headers, &state).await?;
    state.sessions.delete_session(&principal.token_hash).await?;
    Ok(Success::message("Successfully logged out"))
}

#[utoipa::path(
    post,
    path = "/auth/admin/refresh",
    responses(
        (status = 200, description = "Old session revoked, new one issued.", body = AdminSession),
        (status = 401, description = "Missing or invalid admin session.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Success<AdminSession>, ApiError> {
    let principal = require_admin(&headers, &state).await?;
    state.sessions.delete_session(&principal.token_hash).await?;
    Ok(Success::data(issue_session(&state, principal.admin).await?))
}
