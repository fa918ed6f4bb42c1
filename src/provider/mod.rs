//! Identity provider bridge.
//!
//! Everything that touches user credentials or tokens goes through
//! [`IdentityProvider`]. Implementations catch provider failures at this
//! boundary and return a single [`ServiceError`] tagged with the operation that
//! failed, so callers handle one error type regardless of the call.
//!
//! The provider is the source of truth: callers invoke it before writing the
//! local record, never after.

pub mod cognito;
pub mod secret_hash;
pub mod sigv4;

pub use cognito::{Credentials, UserPoolClient, UserPoolConfig};
pub use secret_hash::secret_hash;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Provider-side user status once the confirmation code was accepted.
pub const CONFIRMED_STATUS: &str = "CONFIRMED";

/// Provider operation, used to tag [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Authenticate,
    Refresh,
    RevokeToken,
    ConfirmRegistration,
    ResendConfirmationCode,
    ChangePassword,
    ForgotPassword,
    ConfirmForgotPassword,
    LookupUser,
}

impl Operation {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Register => "register_user_failed",
            Self::Authenticate => "user_authentication_failure",
            Self::Refresh => "token_refresh_failed",
            Self::RevokeToken => "revoke_token_failed",
            Self::ConfirmRegistration => "user_not_confirmed",
            Self::ResendConfirmationCode => "confirmation_code_resending_failed",
            Self::ChangePassword => "change_password_failed",
            Self::ForgotPassword => "forgot_password_request_failed",
            Self::ConfirmForgotPassword => "confirmation_forgot_password_failed",
            Self::LookupUser => "lookup_user_failed",
        }
    }
}

/// Uniform provider failure: `"<operation tag>:<provider message>"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{message}", operation.tag())]
pub struct ServiceError {
    pub operation: Operation,
    /// Provider error type (e.g. `UsernameExistsException`), when one was returned.
    pub code: Option<String>,
    pub message: String,
}

impl ServiceError {
    #[must_use]
    pub fn new(operation: Operation, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            operation,
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

/// Result of a successful remote registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Provider subject id; becomes the local user id.
    pub subject: String,
    /// App client the user registered under; needed for confirmation calls.
    pub client_ref: String,
}

/// Tokens issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenBundle {
    pub access_token: String,
    /// Absent on refresh responses; the caller keeps using its refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
}

/// Provider-side view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderUser {
    pub username: String,
    pub status: Option<String>,
    pub enabled: bool,
    pub attributes: BTreeMap<String, String>,
}

impl ProviderUser {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status.as_deref() == Some(CONFIRMED_STATUS)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create the user in the pool. Extra attributes are sent alongside `email`.
    async fn register(
        &self,
        email: &str,
        password: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<Registration, ServiceError>;

    async fn authenticate(&self, email: &str, password: &str) -> Result<TokenBundle, ServiceError>;

    async fn refresh(&self, email: &str, refresh_token: &str) -> Result<TokenBundle, ServiceError>;

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), ServiceError>;

    async fn confirm_registration(
        &self,
        client_ref: &str,
        code: &str,
        email: &str,
    ) -> Result<(), ServiceError>;

    async fn resend_confirmation_code(&self, client_ref: &str, email: &str)
        -> Result<(), ServiceError>;

    async fn change_password(
        &self,
        access_token: &str,
        previous_password: &str,
        proposed_password: &str,
    ) -> Result<(), ServiceError>;

    async fn forgot_password(&self, email: &str) -> Result<(), ServiceError>;

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        password: &str,
    ) -> Result<(), ServiceError>;

    /// Look a user up by email. A user the pool does not know is `Ok(None)`,
    /// not an error.
    async fn find_user(&self, email: &str) -> Result<Option<ProviderUser>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_operation_tag() {
        let err = ServiceError::new(
            Operation::Register,
            Some("UsernameExistsException".to_string()),
            "User already exists",
        );
        assert_eq!(err.to_string(), "register_user_failed:User already exists");
        assert!(err.is_code("UsernameExistsException"));

        let err = ServiceError::new(Operation::Authenticate, None, "Incorrect username or password.");
        assert_eq!(
            err.to_string(),
            "user_authentication_failure:Incorrect username or password."
        );
    }

    #[test]
    fn confirmed_only_for_confirmed_status() {
        let mut user = ProviderUser::default();
        assert!(!user.is_confirmed());
        user.status = Some("UNCONFIRMED".to_string());
        assert!(!user.is_confirmed());
        user.status = Some(CONFIRMED_STATUS.to_string());
        assert!(user.is_confirmed());
    }
}
