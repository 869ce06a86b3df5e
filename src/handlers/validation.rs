//! Shared request validation helpers.
//!
//! Field errors accumulate into the `{field: [messages]}` map the envelope
//! carries on 422 responses.

use std::collections::HashMap;

use crate::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, problem: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(problem.into());
    }

    /// Err with the standard validation envelope if anything accumulated
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation("The given data was invalid", self.errors))
        }
    }
}

/// Minimal shape check; real deliverability is not this layer's problem
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// Non-empty after trimming
pub fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("ann@example.com"));
        assert!(is_valid_email("a.b+tag@mail.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ann@com"));
        assert!(!is_valid_email("ann@.com"));
    }

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "The email field is required");
        errors.add("email", "The email must be a valid address");
        errors.add("password", "The password field is required");
        let err = errors.into_result().unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors["email"].len(), 2);
                assert_eq!(errors["password"].len(), 1);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn required_trims_blank_values() {
        assert_eq!(required(&Some("  ann  ".into())), Some("ann"));
        assert_eq!(required(&Some("   ".into())), None);
        assert_eq!(required(&None), None);
    }
}
