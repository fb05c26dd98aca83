//! Input validation helpers.
//!
//! Plain functions returning [`DomainError`] so services can chain them with
//! `?` before touching storage.

use crate::error::{DomainError, Result};

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Validate email address format.
///
/// Accepts a local part made of ASCII letters, digits and `+_.-`, followed by
/// a domain containing at least one dot and ending in a top-level domain of
/// two or more letters.
///
/// # Examples
///
/// ```
/// use shopfront_core::validation::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("first.last+tag@mail.example.co"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("user@localhost"));
/// assert!(!is_valid_email("user@example.c"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-');
    if !local.chars().all(valid_local_char) {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let valid_host_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-');
    !host.is_empty()
        && host.chars().all(valid_host_char)
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Validates an email address.
///
/// # Errors
///
/// Returns [`DomainError::InvalidEmail`] if the address is malformed.
pub fn validate_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(DomainError::InvalidEmail(email.to_string()))
    }
}

/// Validates password strength: at least 8 characters containing a letter,
/// a digit and a special character.
///
/// # Errors
///
/// Returns [`DomainError::WeakPassword`] describing the first rule violated.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(DomainError::WeakPassword(
            "password must contain a letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::WeakPassword(
            "password must contain a digit".to_string(),
        ));
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        return Err(DomainError::WeakPassword(
            "password must contain a special character".to_string(),
        ));
    }
    Ok(())
}

/// Checks that `value` has between `min` and `max` characters.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInput`] naming `field` when out of range.
pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(DomainError::InvalidInput(if min == 1 {
            format!("{field} is required")
        } else {
            format!("{field} must be at least {min} characters")
        }));
    }
    if len > max {
        return Err(DomainError::InvalidInput(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Checks that a trimmed `value` is non-empty and at most `max` characters.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInput`] naming `field`.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<()> {
    validate_length(field, value.trim(), 1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_emails() {
        for email in ["", "@example.com", "user@", "a@b@c.com", "us er@example.com", "user@exa_mple.com", "user@example.123"] {
            assert!(!is_valid_email(email), "{email} should be invalid");
        }
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Passw0rd!").is_ok());
        assert!(matches!(validate_password("P0rd!"), Err(DomainError::WeakPassword(_))));
        assert!(matches!(validate_password("12345678!"), Err(DomainError::WeakPassword(_))));
        assert!(matches!(validate_password("Password!"), Err(DomainError::WeakPassword(_))));
        assert!(matches!(validate_password("Password1"), Err(DomainError::WeakPassword(_))));
    }

    #[test]
    fn length_limits() {
        assert!(validate_required("name", "   ", 10).is_err());
        assert!(validate_required("name", "Bob", 10).is_ok());
        assert!(validate_length("name", "abcdef", 0, 5).is_err());
    }
}
