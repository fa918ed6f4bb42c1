//! API handlers and shared request validation.

pub mod admin_auth;
pub mod admins;
pub mod health;
pub mod records;
pub mod user_auth;
pub mod users;
pub mod version;

use super::{envelope::FieldErrors, error::ApiError};
use crate::account::{AccountKind, Conflicts};
use regex::Regex;

pub(crate) const PASSWORD_MIN: usize = 6;
pub(crate) const EMAIL_MAX: usize = 255;

/// Lightweight email sanity check on already-normalized input.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Confirmation codes are numeric.
pub fn valid_code(code: &str) -> bool {
    Regex::new(r"^[0-9]{1,32}$").is_ok_and(|re| re.is_match(code))
}

/// Longest accepted display name per account kind.
pub(crate) const fn name_max(kind: AccountKind) -> usize {
    match kind {
        AccountKind::User => 50,
        AccountKind::Admin => 255,
    }
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Collects per-field messages; [`Validator::finish`] turns them into a 422.
#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, field: &str, message: String) {
        self.errors.entry(field.to_string()).or_default().push(message);
    }

    pub(crate) fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Value of a required field. Missing or blank values record an error and
    /// return an empty string.
    pub(crate) fn required(&mut self, field: &str, value: Option<&str>) -> String {
        match value {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => {
                self.add(field, format!("The {} field is required.", label(field)));
                String::new()
            }
        }
    }

    pub(crate) fn email(&mut self, field: &str, value: &str) {
        if self.has(field) {
            return;
        }
        if !valid_email(value) {
            self.add(field, format!("The {} must be a valid email address.", label(field)));
        }
        self.max(field, value, EMAIL_MAX);
    }

    pub(crate) fn max(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                format!("The {} must not be greater than {max} characters.", label(field)),
            );
        }
    }

    pub(crate) fn min(&mut self, field: &str, value: &str, min: usize) {
        if !self.has(field) && value.chars().count() < min {
            self.add(
                field,
                format!("The {} must be at least {min} characters.", label(field)),
            );
        }
    }

    /// `field` must equal `other`'s value.
    pub(crate) fn same(&mut self, field: &str, value: &str, other: &str, other_value: &str) {
        if !self.has(field) && value != other_value {
            self.add(
                field,
                format!("The {} and {} must match.", label(field), label(other)),
            );
        }
    }

    pub(crate) fn code(&mut self, field: &str, value: &str) {
        if !self.has(field) && !valid_code(value.trim()) {
            self.add(field, format!("The {} must be an integer.", label(field)));
        }
    }

    pub(crate) fn conflicts(&mut self, conflicts: Conflicts) {
        if conflicts.name {
            self.add("name", "The name has already been taken.".to_string());
        }
        if conflicts.email {
            self.add("email", "The email has already been taken.".to_string());
        }
    }

    pub(crate) fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}
