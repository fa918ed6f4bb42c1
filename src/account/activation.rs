//! Account status transitions.
//!
//! The only writer of the `status` column. Handlers parse nothing themselves:
//! they pass the requested token through and map [`ActivationError`].

use super::{Account, AccountKind, AccountStore, Status, StoreError};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("Provided status is invalid or missing: {0:?}")]
    InvalidStatus(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: AccountKind, id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct ActivationService {
    store: Arc<dyn AccountStore>,
}

impl ActivationService {
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Move `account` to the state named by `requested`.
    ///
    /// Unknown tokens fail with [`ActivationError::InvalidStatus`] before any
    /// write. Otherwise exactly one store write is made and the updated record
    /// is returned.
    ///
    /// # Errors
    /// `InvalidStatus` for unknown tokens, `NotFound` if the record vanished,
    /// `Store` on persistence failures.
    #[instrument(skip(self, account), fields(account.id = %account.id, account.kind = %account.kind))]
    pub async fn change_status(
        &self,
        account: &Account,
        requested: &str,
    ) -> Result<Account, ActivationError> {
        let status = Status::parse(requested)
            .ok_or_else(|| ActivationError::InvalidStatus(requested.to_string()))?;
        self.apply(account, status).await
    }

    /// Activate a provider-backed account whose confirmation code the identity
    /// provider has already accepted.
    ///
    /// # Errors
    /// `NotFound` if the record vanished, `Store` on persistence failures.
    #[instrument(skip(self, account), fields(account.id = %account.id, account.kind = %account.kind))]
    pub async fn activate_confirmed(&self, account: &Account) -> Result<Account, ActivationError> {
        self.apply(account, Status::Active).await
    }

    async fn apply(&self, account: &Account, status: Status) -> Result<Account, ActivationError> {
        let updated = self
            .store
            .save_status(account.kind, &account.id, status)
            .await?
            .ok_or_else(|| ActivationError::NotFound {
                kind: account.kind,
                id: account.id.clone(),
            })?;

        info!(
            previous = %account.status,
            current = %updated.status,
            "account status changed"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{memory::MemoryStore, NewAccount};

    async fn seeded(kind: AccountKind) -> Result<(Arc<MemoryStore>, Account), StoreError> {
        let store = Arc::new(MemoryStore::new());
        let account = store
            .create(NewAccount {
                id: "acct-1".to_string(),
                kind,
                name: "test".to_string(),
                email: "test@test.com".to_string(),
                password_hash: "hash".to_string(),
                provider_client_ref: None,
            })
            .await?;
        Ok((store, account))
    }

    #[tokio::test]
    async fn every_canonical_token_is_persisted() -> Result<(), Box<dyn std::error::Error>> {
        for status in Status::ALL {
            let (store, account) = seeded(AccountKind::User).await?;
            let service = ActivationService::new(store.clone());
            let writes_before = store.write_count();

            let updated = service.change_status(&account, status.as_str()).await?;

            assert_eq!(updated.status, status);
            assert_eq!(store.write_count(), writes_before + 1);
            let stored = store.find(AccountKind::User, "acct-1").await?;
            assert_eq!(stored.map(|a| a.status), Some(status));
        }
        Ok(())
    }

    #[tokio::test]
    async fn activates_pending_admin() -> Result<(), Box<dyn std::error::Error>> {
        let (store, account) = seeded(AccountKind::Admin).await?;
        assert_eq!(account.status, Status::Pending);
        let service = ActivationService::new(store.clone());

        let updated = service.change_status(&account, "active").await?;

        assert_eq!(updated.status, Status::Active);
        assert_eq!(updated.kind, AccountKind::Admin);
        Ok(())
    }

    #[tokio::test]
    async fn disabled_accounts_can_be_reactivated() -> Result<(), Box<dyn std::error::Error>> {
        let (store, account) = seeded(AccountKind::User).await?;
        let service = ActivationService::new(store);

        let disabled = service.change_status(&account, "disabled").await?;
        let active = service.change_status(&disabled, "active").await?;

        assert_eq!(active.status, Status::Active);
        Ok(())
    }

    #[tokio::test]
    async fn bogus_token_fails_without_write() -> Result<(), Box<dyn std::error::Error>> {
        let (store, account) = seeded(AccountKind::User).await?;
        let service = ActivationService::new(store.clone());
        let writes_before = store.write_count();

        let result = service.change_status(&account, "bogus").await;

        assert!(matches!(result, Err(ActivationError::InvalidStatus(ref t)) if t == "bogus"));
        assert_eq!(store.write_count(), writes_before);
        let stored = store.find(AccountKind::User, "acct-1").await?;
        assert_eq!(stored.map(|a| a.status), Some(Status::Pending));
        Ok(())
    }

    #[tokio::test]
    async fn missing_record_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let (store, mut account) = seeded(AccountKind::User).await?;
        account.id = "gone".to_string();
        let service = ActivationService::new(store);

        let result = service.activate_confirmed(&account).await;

        assert!(matches!(result, Err(ActivationError::NotFound { .. })));
        Ok(())
    }
}
