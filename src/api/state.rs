use crate::{
    account::{AccountStore, ActivationService, SessionStore},
    provider::IdentityProvider,
};
use std::sync::Arc;

/// Shared handler dependencies, injected through an axum `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub provider: Arc<dyn IdentityProvider>,
    pub activation: ActivationService,
    pub session_ttl_seconds: i64,
}

impl AppState {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        session_ttl_seconds: i64,
    ) -> Self {
        Self {
            activation: ActivationService::new(accounts.clone()),
            accounts,
            sessions,
            provider,
            session_ttl_seconds,
        }
    }
}
