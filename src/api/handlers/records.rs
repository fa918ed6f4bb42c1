//! Record operations shared by the user and admin routes.
//!
//! Handlers in `users`, `admins`, `user_auth` and `admin_auth` stay thin and
//! call into these with the account kind they serve.

use super::{name_max, Validator, PASSWORD_MIN};
use crate::{
    account::{
        normalize_email,
        password::{hash_password, placeholder_hash},
        Account, AccountKind, NewAccount, ProfileUpdate,
    },
    api::{error::ApiError, state::AppState},
};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    /// One of `pending`, `active`, `disabled`. Anything else, including a
    /// non-string value, is an invalid status rather than a malformed body.
    #[schema(value_type = Option<String>)]
    pub status: Option<Value>,
}

/// Validated registration input.
struct Registration {
    name: String,
    email: String,
    password: String,
}

/// Field rules, then uniqueness against the store. Both run before anything
/// is written locally or remotely.
async fn validate_registration(
    state: &AppState,
    kind: AccountKind,
    request: RegisterRequest,
) -> Result<Registration, ApiError> {
    let mut validator = Validator::new();

    let name = validator.required("name", request.name.as_deref());
    let name = name.trim().to_string();
    validator.max("name", &name, name_max(kind));

    let email = normalize_email(&validator.required("email", request.email.as_deref()));
    validator.email("email", &email);

    let password = validator.required("password", request.password.as_deref());
    validator.min("password", &password, PASSWORD_MIN);

    let confirm = validator.required("confirm_password", request.confirm_password.as_deref());
    validator.same("confirm_password", &confirm, "password", &password);

    validator.finish()?;

    let conflicts = state
        .accounts
        .conflicts(kind, Some(&name), Some(&email), None)
        .await?;
    let mut validator = Validator::new();
    validator.conflicts(conflicts);
    validator.finish()?;

    Ok(Registration {
        name,
        email,
        password,
    })
}

/// Register a provider-backed user: remote registration first, local insert
/// only once the provider accepted it.
#[instrument(skip_all)]
pub(crate) async fn register_user(
    state: &AppState,
    request: RegisterRequest,
) -> Result<Account, ApiError> {
    let registration = validate_registration(state, AccountKind::User, request).await?;

    let remote = state
        .provider
        .register(&registration.email, &registration.password, &BTreeMap::new())
        .await
        .map_err(|err| {
            ApiError::service(StatusCode::BAD_REQUEST, "Can't register user error", &err)
        })?;

    let account = state
        .accounts
        .create(NewAccount {
            id: remote.subject,
            kind: AccountKind::User,
            name: registration.name,
            email: registration.email,
            password_hash: placeholder_hash()?,
            provider_client_ref: Some(remote.client_ref),
        })
        .await?;

    info!(user.id = %account.id, "user registered");
    Ok(account)
}

/// Create a local admin with its real password hash.
#[instrument(skip_all)]
pub(crate) async fn create_admin(
    state: &AppState,
    request: RegisterRequest,
) -> Result<Account, ApiError> {
    let registration = validate_registration(state, AccountKind::Admin, request).await?;

    let account = state
        .accounts
        .create(NewAccount {
            id: Uuid::now_v7().to_string(),
            kind: AccountKind::Admin,
            name: registration.name,
            email: registration.email,
            password_hash: hash_password(&registration.password)?,
            provider_client_ref: None,
        })
        .await?;

    info!(admin.id = %account.id, "admin created");
    Ok(account)
}

pub(crate) async fn list(state: &AppState, kind: AccountKind) -> Result<Vec<Account>, ApiError> {
    Ok(state.accounts.list(kind).await?)
}

pub(crate) async fn find(state: &AppState, kind: AccountKind, id: &str) -> Result<Account, ApiError> {
    state
        .accounts
        .find(kind, id)
        .await?
        .ok_or_else(|| ApiError::not_found(kind, id))
}

pub(crate) async fn find_by_email(
    state: &AppState,
    kind: AccountKind,
    email: &str,
) -> Result<Account, ApiError> {
    state
        .accounts
        .find_by_email(kind, email)
        .await?
        .ok_or_else(|| ApiError::email_not_found(kind, email))
}

/// Allow-listed profile update. Uniqueness ignores the record being updated.
#[instrument(skip(state, request))]
pub(crate) async fn update(
    state: &AppState,
    kind: AccountKind,
    id: &str,
    request: UpdateRequest,
) -> Result<Account, ApiError> {
    find(state, kind, id).await?;

    let mut validator = Validator::new();
    let name = request
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    if let Some(name) = &name {
        validator.max("name", name, name_max(kind));
    }
    let email = request
        .email
        .map(|email| normalize_email(&email))
        .filter(|email| !email.is_empty());
    if let Some(email) = &email {
        validator.email("email", email);
    }
    validator.finish()?;

    let conflicts = state
        .accounts
        .conflicts(kind, name.as_deref(), email.as_deref(), Some(id))
        .await?;
    let mut validator = Validator::new();
    validator.conflicts(conflicts);
    validator.finish()?;

    state
        .accounts
        .update_profile(kind, id, ProfileUpdate { name, email })
        .await?
        .ok_or_else(|| ApiError::not_found(kind, id))
}

pub(crate) async fn destroy(state: &AppState, kind: AccountKind, id: &str) -> Result<(), ApiError> {
    if state.accounts.delete(kind, id).await? {
        info!(account.kind = %kind, account.id = id, "account deleted");
        Ok(())
    } else {
        Err(ApiError::not_found(kind, id))
    }
}

/// Hand the requested token to the activation service; it alone writes status.
pub(crate) async fn change_status(
    state: &AppState,
    kind: AccountKind,
    id: &str,
    request: StatusRequest,
) -> Result<Account, ApiError> {
    let account = find(state, kind, id).await?;
    let requested = request
        .status
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default();
    state
        .activation
        .change_status(&account, requested)
        .await
        .map_err(|err| ApiError::activation(kind, err))
}
