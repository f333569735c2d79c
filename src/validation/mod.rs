//! Per-record lead validation.
//!
//! Pure functions of a single candidate. Uniqueness across leads is checked by
//! the repository, not here.

use serde::Serialize;

use crate::errors::AppError;
use crate::models::CreateLeadRequest;

pub const NAME_REQUIRED: &str = "Name is required";
pub const PHONE_REQUIRED: &str = "Phone number is required";
pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Email is invalid";
pub const QUERY_REQUIRED: &str = "Query is required";

/// Outcome of validating one candidate. Every rule is checked.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.valid {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Validate a candidate lead.
pub fn validate_lead(candidate: &CreateLeadRequest) -> ValidationResult {
    validate_fields(
        &candidate.name,
        &candidate.phone,
        &candidate.email,
        &candidate.query,
    )
}

/// Validate the four required lead fields.
pub fn validate_fields(name: &str, phone: &str, email: &str, query: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(NAME_REQUIRED.to_string());
    }
    if phone.trim().is_empty() {
        errors.push(PHONE_REQUIRED.to_string());
    }
    if email.trim().is_empty() {
        errors.push(EMAIL_REQUIRED.to_string());
    } else if !is_valid_email(email.trim()) {
        errors.push(EMAIL_INVALID.to_string());
    }
    if query.trim().is_empty() {
        errors.push(QUERY_REQUIRED.to_string());
    }

    ValidationResult::from_errors(errors)
}

/// Loose `text@text.text` check: one `@`, no whitespace, a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
