#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use roster::{
    account::{memory::MemoryStore, AccountKind, AccountStore},
    api::{self, AppState},
    provider::{
        IdentityProvider, Operation, ProviderUser, Registration, ServiceError, TokenBundle,
        CONFIRMED_STATUS,
    },
};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};
use tower::ServiceExt;

pub const CLIENT_REF: &str = "client-id";

/// Identity provider double that records every call and fails the
/// operations it is told to.
#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    users: Mutex<BTreeMap<String, ProviderUser>>,
    subjects: AtomicUsize,
}

impl FakeProvider {
    pub fn fail(&self, call: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn remote_status(&self, email: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(email)
            .and_then(|user| user.status.clone())
    }

    fn record(&self, call: &'static str, operation: Operation) -> Result<(), ServiceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(call);
        if failing {
            Err(ServiceError::new(
                operation,
                Some("NotAuthorizedException".to_string()),
                format!("{call} rejected"),
            ))
        } else {
            Ok(())
        }
    }

    fn tokens() -> TokenBundle {
        TokenBundle {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            id_token: Some("id".to_string()),
            expires_in: 3600,
            token_type: "Bearer".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn register(
        &self,
        email: &str,
        _password: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<Registration, ServiceError> {
        self.record("register", Operation::Register)?;
        let subject = format!("sub-{}", self.subjects.fetch_add(1, Ordering::SeqCst) + 1);
        let mut attributes = attributes.clone();
        attributes.insert("email".to_string(), email.to_string());
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email.to_string(),
                ProviderUser {
                    username: subject.clone(),
                    status: Some("UNCONFIRMED".to_string()),
                    enabled: true,
                    attributes,
                },
            );
        Ok(Registration {
            subject,
            client_ref: CLIENT_REF.to_string(),
        })
    }

    async fn authenticate(&self, _email: &str, _password: &str) -> Result<TokenBundle, ServiceError> {
        self.record("authenticate", Operation::Authenticate)?;
        Ok(Self::tokens())
    }

    async fn refresh(&self, _email: &str, _refresh_token: &str) -> Result<TokenBundle, ServiceError> {
        self.record("refresh", Operation::Refresh)?;
        Ok(TokenBundle {
            refresh_token: None,
            ..Self::tokens()
        })
    }

    async fn revoke_token(&self, _refresh_token: &str) -> Result<(), ServiceError> {
        self.record("revoke_token", Operation::RevokeToken)
    }

    async fn confirm_registration(
        &self,
        _client_ref: &str,
        _code: &str,
        email: &str,
    ) -> Result<(), ServiceError> {
        self.record("confirm_registration", Operation::ConfirmRegistration)?;
        if let Some(user) = self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(email)
        {
            user.status = Some(CONFIRMED_STATUS.to_string());
        }
        Ok(())
    }

    async fn resend_confirmation_code(
        &self,
        _client_ref: &str,
        _email: &str,
    ) -> Result<(), ServiceError> {
        self.record("resend_confirmation_code", Operation::ResendConfirmationCode)
    }

    async fn change_password(
        &self,
        _access_token: &str,
        _previous_password: &str,
        _proposed_password: &str,
    ) -> Result<(), ServiceError> {
        self.record("change_password", Operation::ChangePassword)
    }

    async fn forgot_password(&self, _email: &str) -> Result<(), ServiceError> {
        self.record("forgot_password", Operation::ForgotPassword)
    }

    async fn confirm_forgot_password(
        &self,
        _email: &str,
        _code: &str,
        _password: &str,
    ) -> Result<(), ServiceError> {
        self.record("confirm_forgot_password", Operation::ConfirmForgotPassword)
    }

    async fn find_user(&self, email: &str) -> Result<Option<ProviderUser>, ServiceError> {
        self.record("find_user", Operation::LookupUser)?;
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(email)
            .cloned())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<FakeProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::default());
        let state = AppState::new(store.clone(), store.clone(), provider.clone(), 3600);
        Self {
            router: api::app(state),
            store,
            provider,
        }
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => request.body(Body::empty())?,
        };

        self.dispatch(request).await
    }

    /// Send `body` verbatim, with `content_type` when given.
    pub async fn send_raw(
        &self,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
        token: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = Request::builder().method(Method::POST).uri(uri);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.dispatch(request.body(Body::from(body.to_string()))?)
            .await
    }

    async fn dispatch(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(body), None).await
    }

    /// Register an admin and return its bearer token.
    pub async fn admin_token(&self, name: &str, email: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/auth/admin/register",
                serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": "secret-pass",
                    "confirm_password": "secret-pass",
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "admin register: {status} {body}");
        body["data"]["authorisation"]["token"]
            .as_str()
            .map(str::to_string)
            .context("missing admin token")
    }

    /// Stored password hash of a record.
    pub async fn password_hash(&self, kind: AccountKind, id: &str) -> Result<String> {
        self.store
            .find(kind, id)
            .await?
            .map(|account| account.password_hash)
            .context("missing account")
    }

    /// Register a provider-backed user and return its id.
    pub async fn register_user(&self, name: &str, email: &str) -> Result<String> {
        let (status, body) = self.post("/auth/user/register", user_body(name, email)).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "user register: {status} {body}");
        body["data"]["id"]
            .as_str()
            .map(str::to_string)
            .context("missing user id")
    }
}

pub fn user_body(name: &str, email: &str) -> Value {
    serde_json::json!({
        "name": name,
        "email": email,
        "password": "secret-pass",
        "confirm_password": "secret-pass",
    })
}
