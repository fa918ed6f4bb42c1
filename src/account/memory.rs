//! In-process store for tests and local runs without PostgreSQL.

use super::{
    Account, AccountKind, AccountStore, Conflicts, NewAccount, ProfileUpdate, SessionRecord,
    SessionStore, Status, StoreError,
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    sessions: HashMap<Vec<u8>, SessionRecord>,
}

/// `AccountStore` + `SessionStore` over a mutex-guarded `Vec`.
///
/// Keeps insertion order and counts every mutating call so callers can assert
/// how many writes an operation performed.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of account writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored accounts of `kind`.
    pub fn len(&self, kind: AccountKind) -> usize {
        self.lock()
            .accounts
            .iter()
            .filter(|a| a.kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().accounts.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) -> String {
        self.writes.fetch_add(1, Ordering::SeqCst);
        now()
    }

    fn modify<F>(&self, kind: AccountKind, id: &str, f: F) -> Option<Account>
    where
        F: FnOnce(&mut Account),
    {
        let mut tables = self.lock();
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.kind == kind && a.id == id)?;
        f(account);
        account.updated_at = self.touch();
        Some(account.clone())
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.lock();
        let duplicate = tables.accounts.iter().any(|a| {
            a.kind == account.kind
                && (a.id == account.id || a.name == account.name || a.email == account.email)
        });
        if duplicate {
            return Err(StoreError::Duplicate { kind: account.kind });
        }

        let created_at = self.touch();
        let record = Account {
            id: account.id,
            kind: account.kind,
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            status: Status::Pending,
            provider_client_ref: account.provider_client_ref,
            created_at: created_at.clone(),
            updated_at: created_at,
        };
        tables.accounts.push(record.clone());
        Ok(record)
    }

    async fn find(&self, kind: AccountKind, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.kind == kind && a.id == id)
            .cloned())
    }

    async fn find_by_email(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.kind == kind && a.email == email)
            .cloned())
    }

    async fn conflicts(
        &self,
        kind: AccountKind,
        name: Option<&str>,
        email: Option<&str>,
        ignore_id: Option<&str>,
    ) -> Result<Conflicts, StoreError> {
        let tables = self.lock();
        let others: Vec<&Account> = tables
            .accounts
            .iter()
            .filter(|a| a.kind == kind && Some(a.id.as_str()) != ignore_id)
            .collect();
        Ok(Conflicts {
            name: name.is_some_and(|name| others.iter().any(|a| a.name == name)),
            email: email.is_some_and(|email| others.iter().any(|a| a.email == email)),
        })
    }

    async fn list(&self, kind: AccountKind) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .filter(|a| a.kind == kind)
            .cloned()
            .collect())
    }

    async fn update_profile(
        &self,
        kind: AccountKind,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.modify(kind, id, |account| {
            if let Some(name) = update.name {
                account.name = name;
            }
            if let Some(email) = update.email {
                account.email = email;
            }
        }))
    }

    async fn save_status(
        &self,
        kind: AccountKind,
        id: &str,
        status: Status,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.modify(kind, id, |account| account.status = status))
    }

    async fn save_password_hash(
        &self,
        kind: AccountKind,
        id: &str,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.modify(kind, id, |account| {
            account.password_hash = password_hash.to_string();
        }))
    }

    async fn delete(&self, kind: AccountKind, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let before = tables.accounts.len();
        tables.accounts.retain(|a| !(a.kind == kind && a.id == id));
        let deleted = tables.accounts.len() < before;
        if deleted {
            self.touch();
        }
        Ok(deleted)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        admin_id: &str,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        self.lock().sessions.insert(
            token_hash.to_vec(),
            SessionRecord {
                admin_id: admin_id.to_string(),
                expires_at_unix: Utc::now().timestamp() + ttl_seconds,
            },
        );
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>, StoreError> {
        let now = Utc::now().timestamp();
        Ok(self
            .lock()
            .sessions
            .get(token_hash)
            .filter(|session| session.expires_at_unix > now)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError> {
        Ok(self.lock().sessions.remove(token_hash).is_some())
    }
}
