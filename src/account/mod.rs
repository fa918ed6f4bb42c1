//! Local account records and their lifecycle.
//!
//! Users and admins share one record shape ([`Account`]) and live in separate
//! tables selected by [`AccountKind`]. Persistence goes through the
//! [`AccountStore`] trait so handlers and the activation service never depend on
//! a concrete database.

pub mod activation;
pub mod memory;
pub mod password;
pub mod postgres;
pub mod status;
pub mod store;

pub use activation::{ActivationError, ActivationService};
pub use status::Status;
pub use store::{
    AccountStore, Conflicts, NewAccount, ProfileUpdate, SessionRecord, SessionStore, StoreError,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Which account class a record belongs to. Names and emails are unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Admin,
}

impl AccountKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Table holding records of this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Admin => "admins",
        }
    }

    /// Capitalized label used in response messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted account.
///
/// `password_hash` is never serialized. For users it is a placeholder since the
/// identity provider verifies credentials.
#[derive(Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Account {
    pub id: String,
    pub kind: AccountKind,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_client_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("status", &self.status)
            .field("provider_client_ref", &self.provider_client_ref)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Normalize an email for lookup and uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
