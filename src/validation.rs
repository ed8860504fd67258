//! Skill name validation.
//!
//! A valid name is non-empty, carries no leading or trailing whitespace, and uses
//! only ASCII letters, digits, `-`, `_`, `:` and `/`. The resolver keys its merge
//! on this name, so anything that fails here is skipped rather than guessed at.

use crate::error::NameError;

/// Validate a skill name.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    if name.trim() != name {
        return Err(NameError::SurroundingWhitespace(name.to_string()));
    }

    if !name.chars().all(is_name_char) {
        return Err(NameError::InvalidChars(name.to_string()));
    }

    Ok(())
}

/// Convenience predicate over [`validate_name`].
pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '/')
}
