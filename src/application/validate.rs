//! Input checks shared by the services.

use crate::domain::error::DomainError;

pub fn ensure_non_empty(value: &str, field: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Loose shape check: something on both sides of an `@`, no whitespace.
pub fn ensure_email(value: &str, field: &str) -> Result<(), DomainError> {
    ensure_non_empty(value, field)?;
    let value = value.trim();
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
        && !value.contains(char::is_whitespace);
    if !valid {
        return Err(DomainError::validation(format!(
            "{field} must be a valid email address"
        )));
    }
    Ok(())
}

/// Trim, and turn blank strings into `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
