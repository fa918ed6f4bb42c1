//! # Roster (account management over a hosted user pool)
//!
//! `roster` keeps local records for two kinds of accounts, users and admins,
//! and exposes them over a small REST API.
//!
//! ## Users
//!
//! Users are backed by a hosted user pool. Registration, password checks,
//! confirmation codes and token issuance all happen at the provider; the local
//! row is a cache keyed by the provider subject id. The provider is always
//! called first, so the local record never claims more than the provider
//! knows (a user is only `active` locally once the pool accepted the
//! confirmation code).
//!
//! ## Admins
//!
//! Admins are local accounts with an Argon2 password hash and bearer sessions
//! stored as SHA-256 hashes.
//!
//! ## Status lifecycle
//!
//! Every account starts `pending`. Status changes go through
//! [`account::ActivationService`]; handlers never write the column directly.

pub mod account;
pub mod api;
pub mod cli;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
