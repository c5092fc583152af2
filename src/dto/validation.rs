//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validates an opaque client-supplied identifier (session or puzzle id):
/// non-empty, at most 128 characters, no whitespace or control characters.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("session-42")        // Ok
/// validate_identifier("")                  // Err - empty
/// validate_identifier("has a space")       // Err - whitespace
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        let mut err = ValidationError::new("identifier_empty");
        err.message = Some("Identifier must not be empty".into());
        return Err(err);
    }

    if id.chars().count() > MAX_IDENTIFIER_LENGTH {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!("Identifier must be at most {MAX_IDENTIFIER_LENGTH} characters").into(),
        );
        return Err(err);
    }

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        let mut err = ValidationError::new("identifier_format");
        err.message =
            Some("Identifier must not contain whitespace or control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("session-42").is_ok());
        assert!(validate_identifier("puzzle_1700000000_deadbeef").is_ok());
        assert!(validate_identifier("a").is_ok());
    }

    #[test]
    fn test_validate_identifier_invalid() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("has a space").is_err());
        assert!(validate_identifier("tab\tseparated").is_err());
        assert!(validate_identifier(&"x".repeat(129)).is_err());
    }
}
