//! Local password hashes.
//!
//! Admin passwords are verified here. User rows only carry a placeholder: the
//! identity provider owns their credentials, so the local hash is of a random
//! value nobody knows and is rotated whenever the provider accepts a new
//! password.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// Argon2id PHC string for `password`.
///
/// # Errors
/// Returns an error if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// Check `password` against a stored PHC string. Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Hash of 32 random bytes, stored for provider-backed accounts.
///
/// # Errors
/// Returns an error if Argon2 rejects the input.
pub fn placeholder_hash() -> Result<String, PasswordError> {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hash_password(&Base64UrlUnpadded::encode_string(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() -> Result<(), PasswordError> {
        let hash = hash_password("correct horse")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        Ok(())
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn placeholders_are_unique() -> Result<(), PasswordError> {
        let first = placeholder_hash()?;
        let second = placeholder_hash()?;
        assert_ne!(first, second);
        assert!(!verify_password("password", &first));
        Ok(())
    }
}
