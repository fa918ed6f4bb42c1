//! Persistence traits for accounts and admin sessions.

use super::{Account, AccountKind, Status};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A unique index rejected the write (lost a race with the pre-check).
    #[error("duplicate {kind} record")]
    Duplicate { kind: AccountKind },
}

/// Fields for a new record. Status is not settable: new records are always `pending`.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: String,
    pub kind: AccountKind,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub provider_client_ref: Option<String>,
}

/// Which unique fields are already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conflicts {
    pub name: bool,
    pub email: bool,
}

impl Conflicts {
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !self.name && !self.email
    }
}

/// Allow-listed profile fields; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// Admin session resolved from a token hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub admin_id: String,
    pub expires_at_unix: i64,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Round trip to the backing store, used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new record with status `pending`.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find(&self, kind: AccountKind, id: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Report which of `name` / `email` are already used by another record of
    /// the same kind, ignoring `ignore_id` (the record being updated).
    async fn conflicts(
        &self,
        kind: AccountKind,
        name: Option<&str>,
        email: Option<&str>,
        ignore_id: Option<&str>,
    ) -> Result<Conflicts, StoreError>;

    async fn list(&self, kind: AccountKind) -> Result<Vec<Account>, StoreError>;

    async fn update_profile(
        &self,
        kind: AccountKind,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, StoreError>;

    /// Overwrite the status column. Only [`super::ActivationService`] calls this.
    async fn save_status(
        &self,
        kind: AccountKind,
        id: &str,
        status: Status,
    ) -> Result<Option<Account>, StoreError>;

    async fn save_password_hash(
        &self,
        kind: AccountKind,
        id: &str,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn delete(&self, kind: AccountKind, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        admin_id: &str,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<(), StoreError>;

    /// Resolve an unexpired session.
    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>, StoreError>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_empty_only_when_nothing_taken() {
        assert!(Conflicts::default().is_empty());
        assert!(!Conflicts {
            name: true,
            email: false
        }
        .is_empty());
        assert!(!Conflicts {
            name: false,
            email: true
        }
        .is_empty());
    }

    #[test]
    fn profile_update_empty() {
        assert!(ProfileUpdate::default().is_empty());
        assert!(!ProfileUpdate {
            name: Some("bob".to_string()),
            email: None
        }
        .is_empty());
    }
}
