//! Field checks applied before request data becomes a CLI token.

use crate::error::ValidationError;

/// Free text such as names and messages. Must not be blank and cannot carry
/// NUL, which no argv can hold.
pub fn require_text(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    if value.contains('\0') {
        return Err(ValidationError::new(format!("{field} contains a NUL byte")));
    }
    Ok(value.to_string())
}

/// Identifiers, ids and single-word option values. Must not look like a
/// flag and cannot contain whitespace or control characters.
pub fn require_word(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    if value.starts_with('-') {
        return Err(ValidationError::new(format!("{field} must not start with '-'")));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::new(format!("{field} must be a single word")));
    }
    Ok(value.to_string())
}
