//! User authentication endpoints backed by the identity provider.
//!
//! Flow Overview:
//! 1) Validate input and resolve the local record.
//! 2) Call the identity provider; it decides.
//! 3) Only after the provider succeeded, write the local change (insert,
//!    activation, placeholder rotation).

use super::{
    records::{self, RegisterRequest},
    Validator, PASSWORD_MIN,
};
use crate::{
    account::{normalize_email, password::placeholder_hash, Account, AccountKind, Status},
    api::{
        envelope::{ErrorBody, Success},
        error::ApiError,
        payload::Payload,
        session::bearer_token,
        state::AppState,
    },
    provider::{ProviderUser, TokenBundle},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

const KIND: AccountKind = AccountKind::User;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub email: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmRegistrationRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub email: Option<String>,
    pub previous_password: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ConfirmForgotPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Provider tokens plus the local record.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserTokens {
    #[serde(flatten)]
    pub tokens: TokenBundle,
    pub user: Account,
}

fn email_field(validator: &mut Validator, value: Option<&str>) -> String {
    let email = normalize_email(&validator.required("email", value));
    validator.email("email", &email);
    email
}

fn new_password_fields(
    validator: &mut Validator,
    password: Option<&str>,
    confirm: Option<&str>,
) -> String {
    let password = validator.required("password", password);
    validator.min("password", &password, PASSWORD_MIN);
    let confirm = validator.required("confirm_password", confirm);
    validator.same("confirm_password", &confirm, "password", &password);
    password
}

/// Local record and provider record for `email`; both must exist.
async fn provider_backed_user(
    state: &AppState,
    email: &str,
) -> Result<(Account, ProviderUser), ApiError> {
    let account = records::find_by_email(state, KIND, email).await?;
    let remote = state
        .provider
        .find_user(email)
        .await
        .map_err(|err| {
            ApiError::service(StatusCode::INTERNAL_SERVER_ERROR, "Can't look up user error", &err)
        })?
        .ok_or_else(|| ApiError::email_not_found(KIND, email))?;
    Ok((account, remote))
}

fn client_ref(account: &Account) -> Result<&str, ApiError> {
    account.provider_client_ref.as_deref().ok_or_else(|| {
        tracing::error!(user.id = %account.id, "user record has no provider client reference");
        ApiError::Internal("Internal server error".to_string())
    })
}

/// The provider now holds a new password; replace the local placeholder.
async fn rotate_placeholder(state: &AppState, account: &Account) -> Result<(), ApiError> {
    state
        .accounts
        .save_password_hash(KIND, &account.id, &placeholder_hash()?)
        .await?
        .ok_or_else(|| ApiError::not_found(KIND, &account.id))?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/auth/user/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered with the identity provider; local record is pending.", body = Account),
        (status = 400, description = "Identity provider rejected the registration.", body = ErrorBody),
        (status = 422, description = "Validation failed or name/email already taken.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<RegisterRequest>,
) -> Result<Success<Account>, ApiError> {
    let user = records::register_user(&state, request).await?;
    Ok(Success::created(user).with_message("User created successfully"))
}

#[utoipa::path(
    post,
    path = "/auth/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued by the identity provider.", body = UserTokens),
        (status = 400, description = "Identity provider rejected the credentials.", body = ErrorBody),
        (status = 404, description = "No local user with this email.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<LoginRequest>,
) -> Result<Success<UserTokens>, ApiError> {
    let mut validator = Validator::new();
    let email = email_field(&mut validator, request.email.as_deref());
    let password = validator.required("password", request.password.as_deref());
    validator.finish()?;

    let user = records::find_by_email(&state, KIND, &email).await?;
    let tokens = state
        .provider
        .authenticate(&email, &password)
        .await
        .map_err(|err| ApiError::service(StatusCode::BAD_REQUEST, "Can't login user error", &err))?;

    info!(user.id = %user.id, "user logged in");
    Ok(Success::data(UserTokens { tokens, user }))
}

#[utoipa::path(
    post,
    path = "/auth/user/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Fresh tokens from the identity provider.", body = UserTokens),
        (status = 400, description = "Identity provider rejected the refresh token.", body = ErrorBody),
        (status = 404, description = "No local user with this email.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<RefreshRequest>,
) -> Result<Success<UserTokens>, ApiError> {
    let mut validator = Validator::new();
    let email = email_field(&mut validator, request.email.as_deref());
    let refresh_token = validator.required("refresh_token", request.refresh_token.as_deref());
    validator.finish()?;

    let user = records::find_by_email(&state, KIND, &email).await?;
    let tokens = state
        .provider
        .refresh(&email, refresh_token.trim())
        .await
        .map_err(|err| ApiError::service(StatusCode::BAD_REQUEST, "Can't refresh token error", &err))?;

    Ok(Success::data(UserTokens { tokens, user }))
}

#[utoipa::path(
    post,
    path = "/auth/user/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Refresh token revoked."),
        (status = 400, description = "Identity provider rejected the revocation.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<LogoutRequest>,
) -> Result<Success<()>, ApiError> {
    let mut validator = Validator::new();
    let refresh_token = validator.required("refresh_token", request.refresh_token.as_deref());
    validator.finish()?;

    state
        .provider
        .revoke_token(refresh_token.trim())
        .await
        .map_err(|err| ApiError::service(StatusCode::BAD_REQUEST, "Can't logout user error", &err))?;

    Ok(Success::message("Successfully logged out"))
}

#[utoipa::path(
    post,
    path = "/auth/user/confirm-registration",
    request_body = ConfirmRegistrationRequest,
    responses(
        (status = 200, description = "User confirmed (or already confirmed)."),
        (status = 403, description = "User was disabled by an admin.", body = ErrorBody),
        (status = 404, description = "User unknown locally or at the identity provider.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
        (status = 500, description = "Identity provider rejected the code; status unchanged.", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn confirm_registration(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<ConfirmRegistrationRequest>,
) -> Result<Success<()>, ApiError> {
    let mut validator = Validator::new();
    let email = email_field(&mut validator, request.email.as_deref());
    let code = validator.required("code", request.code.as_deref());
    validator.code("code", &code);
    validator.finish()?;

    let (user, _remote) = provider_backed_user(&state, &email).await?;
    match user.status {
        Status::Active => return Ok(Success::message("User is already confirmed")),
        // Confirmation must not re-enable an account an admin switched off.
        Status::Disabled => return Err(ApiError::Forbidden(format!("User {email} is disabled"))),
        Status::Pending => {}
    }

    state
        .provider
        .confirm_registration(client_ref(&user)?, code.trim(), &email)
        .await
        .map_err(|err| {
            ApiError::service(StatusCode::INTERNAL_SERVER_ERROR, "Can't confirm user error", &err)
        })?;

    state
        .activation
        .activate_confirmed(&user)
        .await
        .map_err(|err| ApiError::activation(KIND, err))?;

    Ok(Success::message(format!("User {email} was confirmed")))
}

#[utoipa::path(
    post,
    path = "/auth/user/resend-confirmation-code",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code resent, or user already confirmed."),
        (status = 404, description = "User unknown locally or at the identity provider.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
        (status = 500, description = "Identity provider failed to resend the code.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn resend_confirmation_code(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<EmailRequest>,
) -> Result<Success<()>, ApiError> {
    let mut validator = Validator::new();
    let email = email_field(&mut validator, request.email.as_deref());
    validator.finish()?;

    let (user, remote) = provider_backed_user(&state, &email).await?;
    if remote.is_confirmed() {
        return Ok(Success::message("User is already confirmed"));
    }

    state
        .provider
        .resend_confirmation_code(client_ref(&user)?, &email)
        .await
        .map_err(|err| {
            ApiError::service(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Can't resend confirmation code error",
                &err,
            )
        })?;

    Ok(Success::message(format!(
        "Confirmation code was resent to {email} email."
    )))
}

#[utoipa::path(
    post,
    path = "/auth/user/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed at the identity provider."),
        (status = 401, description = "Missing bearer access token.", body = ErrorBody),
        (status = 404, description = "User unknown locally or at the identity provider.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
        (status = 500, description = "Identity provider rejected the change.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn change_password(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<ChangePasswordRequest>,
) -> Result<Success<()>, ApiError> {
    let mut validator = Validator::new();
    let email = email_field(&mut validator, request.email.as_deref());
    let previous = validator.required("previous_password", request.previous_password.as_deref());
    let password = new_password_fields(
        &mut validator,
        request.password.as_deref(),
        request.confirm_password.as_deref(),
    );
    validator.finish()?;

    let access_token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated request.".to_string()))?;

    let (user, _remote) = provider_backed_user(&state, &email).await?;

    state
        .provider
        .change_password(&access_token, &previous, &password)
        .await
        .map_err(|err| {
            ApiError::service(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Can't change user password error",
                &err,
            )
        })?;

    rotate_placeholder(&state, &user).await?;

    Ok(Success::message(format!(
        "Password was successfully reset for the user {email}."
    )))
}

#[utoipa::path(
    post,
    path = "/auth/user/forgot-password",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Reset code sent by the identity provider."),
        (status = 404, description = "No local user with this email.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
        (status = 500, description = "Identity provider failed to send the code.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<EmailRequest>,
) -> Result<Success<()>, ApiError> {
    let mut validator = Validator::new();
    let email = email_field(&mut validator, request.email.as_deref());
    validator.finish()?;

    records::find_by_email(&state, KIND, &email).await?;

    state
        .provider
        .forgot_password(&email)
        .await
        .map_err(|err| {
            ApiError::service(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Can't request password reset error",
                &err,
            )
        })?;

    Ok(Success::message(format!(
        "Password reset code was sent to {email} email."
    )))
}

#[utoipa::path(
    post,
    path = "/auth/user/confirm-forgot-password",
    request_body = ConfirmForgotPasswordRequest,
    responses(
        (status = 200, description = "Password reset at the identity provider."),
        (status = 404, description = "No local user with this email.", body = ErrorBody),
        (status = 422, description = "Validation failed.", body = ErrorBody),
        (status = 500, description = "Identity provider rejected the code.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn confirm_forgot_password(
    Extension(state): Extension<Arc<AppState>>,
    Payload(request): Payload<ConfirmForgotPasswordRequest>,
) -> Result<Success<()>, ApiError> {
    let mut validator = Validator::new();
    let email = email_field(&mut validator, request.email.as_deref());
    let code = validator.required("code", request.code.as_deref());
    validator.code("code", &code);
    let password = new_password_fields(
        &mut validator,
        request.password.as_deref(),
        request.confirm_password.as_deref(),
    );
    validator.finish()?;

    let user = records::find_by_email(&state, KIND, &email).await?;

    state
        .provider
        .confirm_forgot_password(&email, code.trim(), &password)
        .await
        .map_err(|err| {
            ApiError::service(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Can't reset user password error",
                &err,
            )
        })?;

    rotate_placeholder(&state, &user).await?;

    Ok(Success::message(format!(
        "Password was successfully reset for the user {email}."
    )))
}
