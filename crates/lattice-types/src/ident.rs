//! Object identifier validation.
//!
//! Identifiers are application-supplied strings. They become key segments in
//! the persisted layout, so they must never contain the key separator, and
//! they must be safe to embed in scan patterns. Valid identifiers:
//!
//! - Must be non-empty
//! - Must not contain the key separator `:`
//! - Must not contain whitespace or control characters
//! - Must not contain the pattern metacharacters `*`, `?`, `[`, `\`

use crate::error::IdentError;

/// The key segment separator used throughout the persisted layout.
pub const KEY_SEPARATOR: char = ':';

/// Characters that are forbidden anywhere in an identifier.
const FORBIDDEN_CHARS: &[char] = &[KEY_SEPARATOR, '*', '?', '[', '\\'];

/// Validate an object identifier, returning `Ok(())` if valid.
///
/// Every registry and relationship operation validates the identifier before
/// issuing any store command; an empty or malformed identifier fails fast.
///
/// # Examples
///
/// ```
/// use lattice_types::validate_identifier;
///
/// assert!(validate_identifier("cust-4f9a").is_ok());
/// assert!(validate_identifier("").is_err());
/// assert!(validate_identifier("a:b").is_err());
/// ```
pub fn validate_identifier(id: &str) -> Result<(), IdentError> {
    if id.is_empty() {
        return Err(IdentError::InvalidIdentifier {
            value: id.to_string(),
            reason: "identifier must not be empty".into(),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if id.contains(*ch) {
            return Err(IdentError::InvalidIdentifier {
                value: id.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    if id.chars().any(|c| c.is_whitespace()) {
        return Err(IdentError::InvalidIdentifier {
            value: id.to_string(),
            reason: "must not contain whitespace".into(),
        });
    }

    if id.chars().any(|c| c.is_control()) {
        return Err(IdentError::InvalidIdentifier {
            value: id.to_string(),
            reason: "must not contain control characters".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        assert!(validate_identifier("abc").is_ok());
        assert!(validate_identifier("cust-4f9a").is_ok());
        assert!(validate_identifier("user_42").is_ok());
        assert!(validate_identifier("V1.0").is_ok());
        assert!(validate_identifier("0").is_ok());
    }

    #[test]
    fn reject_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn reject_separator() {
        assert!(validate_identifier("a:b").is_err());
        assert!(validate_identifier(":leading").is_err());
        assert!(validate_identifier("trailing:").is_err());
    }

    #[test]
    fn reject_whitespace() {
        assert!(validate_identifier("has space").is_err());
        assert!(validate_identifier("has\ttab").is_err());
        assert!(validate_identifier("has\nnewline").is_err());
    }

    #[test]
    fn reject_pattern_metacharacters() {
        assert!(validate_identifier("a*b").is_err());
        assert!(validate_identifier("a?b").is_err());
        assert!(validate_identifier("a[b").is_err());
        assert!(validate_identifier("a\\b").is_err());
    }

    #[test]
    fn reject_control_characters() {
        assert!(validate_identifier("a\u{0}b").is_err());
        assert!(validate_identifier("bell\u{7}").is_err());
    }

    #[test]
    fn error_carries_value_and_reason() {
        let err = validate_identifier("a:b").unwrap_err();
        let IdentError::InvalidIdentifier { value, reason } = err;
        assert_eq!(value, "a:b");
        assert!(reason.contains("forbidden"));
    }
}
