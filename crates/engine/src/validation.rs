// ============================
// crates/engine/src/validation.rs
// ============================
//! Input validation for entity fields.
use crate::error::AuthError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Entity names: start with a letter, then letters/digits/space and a few
/// separators, 2..=64 chars total.
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_ .-]{1,63}$").expect("valid name regex"));

/// Deliberately loose email shape check; deliverability is not our problem.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Validate a user/role/permission name before it reaches the store.
pub fn validate_entity_name(field: &'static str, name: &str) -> Result<(), AuthError> {
    if NAME_RE.is_match(name) {
        return Ok(());
    }
    Err(AuthError::Validation {
        field,
        reason: format!("{name:?} is not an acceptable name"),
    })
}

/// Validate an email address shape.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if EMAIL_RE.is_match(email) {
        return Ok(());
    }
    Err(AuthError::Validation {
        field: "email",
        reason: format!("{email:?} is not an email address"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_names() {
        for name in ["root", "User_0", "Power Users", "see users", "delete.user"] {
            assert!(validate_entity_name("name", name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_bad_names() {
        for name in ["", "x", "0day", " leading", "bad\nname", &"a".repeat(80)] {
            assert!(validate_entity_name("name", name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn email_shape_check() {
        assert!(validate_email("root@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@example.com").is_err());
    }
}
