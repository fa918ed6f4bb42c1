//! API error taxonomy and its envelope rendering.

use super::envelope::{ErrorBody, FieldErrors, STATUS_ERROR};
use crate::{
    account::{password::PasswordError, AccountKind, ActivationError, StoreError},
    provider::ServiceError,
};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error")]
    Validation(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("Provided {0}'s status is invalid or missed")]
    InvalidStatus(AccountKind),
    /// Identity provider failure, with the HTTP status chosen by the call site.
    #[error("{message}")]
    Service { status: StatusCode, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::Service { status, .. } => *status,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wrap a provider failure as `"<context>: <tag>:<provider message>"`.
    #[must_use]
    pub fn service(status: StatusCode, context: &str, err: &ServiceError) -> Self {
        warn!(operation = err.operation.tag(), code = ?err.code, "identity provider call failed: {}", err.message);
        Self::Service {
            status,
            message: format!("{context}: {err}"),
        }
    }

    #[must_use]
    pub fn not_found(kind: AccountKind, id: &str) -> Self {
        Self::NotFound(format!("{} with ID {id} was not found", kind.label()))
    }

    #[must_use]
    pub fn email_not_found(kind: AccountKind, email: &str) -> Self {
        Self::NotFound(format!("{} with email {email} was not found", kind.label()))
    }

    /// Status changes are per kind; the activation error carries no kind.
    #[must_use]
    pub fn activation(kind: AccountKind, err: ActivationError) -> Self {
        match err {
            ActivationError::InvalidStatus(_) => Self::InvalidStatus(kind),
            ActivationError::NotFound { kind, id } => Self::not_found(kind, &id),
            ActivationError::Store(err) => err.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { kind } => {
                let mut errors = FieldErrors::new();
                errors.insert(
                    "email".to_string(),
                    vec![format!("A {kind} with this name or email already exists.")],
                );
                Self::Validation(errors)
            }
            StoreError::Database(err) => {
                error!("Store operation failed: {err}");
                Self::Internal(INTERNAL_MESSAGE.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert("body".to_string(), vec![rejection.body_text()]);
        Self::Validation(errors)
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        error!("{err}");
        Self::Internal(INTERNAL_MESSAGE.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let errors = match self {
            Self::Validation(errors) => errors,
            _ => FieldErrors::new(),
        };

        let body = ErrorBody {
            status: STATUS_ERROR.to_string(),
            code: status.as_u16(),
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}
