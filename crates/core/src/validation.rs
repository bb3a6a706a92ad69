//! Field limits and custom validators used by request DTOs.

use validator::ValidationError;

/// Maximum video title length in characters.
pub const TITLE_MAX_LEN: u64 = 50;

/// Maximum video description length in characters.
pub const DESCRIPTION_MAX_LEN: u64 = 200;

/// Username length bounds.
pub const USERNAME_MIN_LEN: u64 = 3;
pub const USERNAME_MAX_LEN: u64 = 30;

/// Minimum password length accepted at registration.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Usernames may contain ASCII letters, digits, `_` and `.`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_charset");
        err.message = Some("Username may only contain letters, digits, '_' and '.'".into());
        Err(err)
    }
}

/// Reject values that are empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Canonical form for usernames and emails: trimmed, lower-case.
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}
