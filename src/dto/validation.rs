//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects values that are empty once surrounding whitespace is removed.
///
/// ```ignore
/// validate_not_blank("space")  // Ok
/// validate_not_blank("   ")    // Err
/// ```
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Usernames are 1 to 50 visible characters without whitespace inside.
pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    validate_not_blank(value)?;

    let trimmed = value.trim();
    if trimmed.chars().count() > 50 {
        let mut err = ValidationError::new("username_length");
        err.message = Some("Username must be at most 50 characters".into());
        return Err(err);
    }
    if trimmed.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("username_format");
        err.message = Some("Username must not contain spaces".into());
        return Err(err);
    }
    Ok(())
}
