//! Response envelope shared by every API route except `/health` and `/version`.
//!
//! Success: `{"status": "ok", "message"?, "data"?}`.
//! Failure: `{"status": "error", "code", "message", "errors"}` (see [`super::error`]).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";

/// Field name -> validation messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: String,
    pub code: u16,
    pub message: String,
    pub errors: FieldErrors,
}

/// A successful response: HTTP status plus envelope.
#[derive(Debug)]
pub struct Success<T> {
    code: StatusCode,
    envelope: Envelope<T>,
}

impl<T: Serialize> Success<T> {
    #[must_use]
    pub fn data(data: T) -> Self {
        Self {
            code: StatusCode::OK,
            envelope: Envelope {
                status: STATUS_OK,
                message: None,
                data: Some(data),
            },
        }
    }

    #[must_use]
    pub fn created(data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::data(data)
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.envelope.message = Some(message.into());
        self
    }
}

impl Success<()> {
    /// Message-only success.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK,
            envelope: Envelope {
                status: STATUS_OK,
                message: Some(message.into()),
                data: None,
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self.envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_only_omits_data() -> Result<(), serde_json::Error> {
        let success = Success::message("Successfully logged out");
        assert_eq!(success.code, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&success.envelope)?,
            json!({"status": "ok", "message": "Successfully logged out"})
        );
        Ok(())
    }

    #[test]
    fn data_with_message() -> Result<(), serde_json::Error> {
        let success = Success::created(json!({"id": "1"})).with_message("created");
        assert_eq!(success.code, StatusCode::CREATED);
        assert_eq!(
            serde_json::to_value(&success.envelope)?,
            json!({"status": "ok", "message": "created", "data": {"id": "1"}})
        );
        Ok(())
    }
}
