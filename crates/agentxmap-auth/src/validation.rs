//! Input checks run before any write.

use crate::error::AuthError;

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Shallow syntactic check: one `@`, non-empty local part, a dotted
/// domain and no whitespace. Deliverability is not our concern.
pub(crate) fn validate_email(email: &str) -> Result<(), AuthError> {
    require_non_empty("email", email)?;
    if email.chars().any(char::is_whitespace) {
        return Err(AuthError::validation("email", "must not contain whitespace"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::validation("email", "must contain '@'"));
    };
    if local.is_empty() || domain.contains('@') {
        return Err(AuthError::validation("email", "is malformed"));
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(AuthError::validation("email", "domain is malformed"));
    }
    Ok(())
}
