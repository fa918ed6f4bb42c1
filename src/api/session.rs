//! Admin bearer sessions.
//!
//! Flow Overview:
//! 1) Login/register issues a random token; only its SHA-256 hash is stored.
//! 2) Admin-only handlers call [`require_admin`] with the request headers.
//! 3) Refresh rotates the token; logout deletes it.

use super::{error::ApiError, state::AppState};
use crate::account::{Account, AccountKind, Status};
use anyhow::{Context, Result};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::error;
use utoipa::ToSchema;

pub const TOKEN_TYPE: &str = "bearer";

/// Authenticated admin resolved from a bearer session.
#[derive(Clone, Debug)]
pub struct Principal {
    pub admin: Account,
    pub token_hash: Vec<u8>,
}

/// Credentials handed to the client after login, register or refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct Authorisation {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub expires_in: i64,
}

/// Admin record plus its fresh session.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSession {
    pub admin: Account,
    pub authorisation: Authorisation,
}

/// 32 random bytes, URL-safe base64 without padding.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Token from `Authorization: Bearer <token>`, if present and non-empty.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the bearer session into an admin, or fail with 401/403.
pub(crate) async fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<Principal, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated request.".to_string()))?;
    let token_hash = hash_session_token(&token);

    let record = state
        .sessions
        .lookup_session(&token_hash)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session.".to_string()))?;

    let admin = state
        .accounts
        .find(AccountKind::Admin, &record.admin_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session.".to_string()))?;

    if admin.status == Status::Disabled {
        return Err(ApiError::Forbidden("Admin account is disabled.".to_string()));
    }

    Ok(Principal { admin, token_hash })
}

/// Create a session for `admin` and return the raw token to the caller.
pub(crate) async fn issue_session(state: &AppState, admin: Account) -> Result<AdminSession, ApiError> {
    let token = generate_session_token().map_err(|err| {
        error!("{err:#}");
        ApiError::Internal("Internal server error".to_string())
    })?;

    state
        .sessions
        .create_session(
            &admin.id,
            &hash_session_token(&token),
            state.session_ttl_seconds,
        )
        .await?;

    Ok(AdminSession {
        admin,
        authorisation: Authorisation {
            token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: state.session_ttl_seconds,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    #[test]
    fn bearer_token_extracts_value() {
        assert_eq!(bearer_token(&headers("Bearer abc")).as_deref(), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer  abc ")).as_deref(), Some("abc"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer  ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn session_tokens_are_random_and_url_safe() -> Result<()> {
        let first = generate_session_token()?;
        let second = generate_session_token()?;
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        Ok(())
    }

    #[test]
    fn hash_is_stable_sha256() {
        let hash = hash_session_token("token");
        assert_eq!(hash.len(), 32);
        assert_eq!(hash, hash_session_token("token"));
        assert_ne!(hash, hash_session_token("other"));
    }
}
