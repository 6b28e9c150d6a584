//! Local input validation shared by session and note use-cases.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// A required field was missing or blank. Detected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the offending input field.
    pub field: &'static str,
    /// Short human-readable reason.
    pub reason: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid `{}`: {}", self.field, self.reason)
    }
}

impl Error for ValidationError {}

/// Rejects empty values. Whitespace is kept as-is (passwords may contain it).
pub fn require_present(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

/// Rejects values that are empty after trimming.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_non_blank, require_present};

    #[test]
    fn present_accepts_whitespace_but_not_empty() {
        assert!(require_present("password", " ").is_ok());
        let err = require_present("password", "").unwrap_err();
        assert_eq!(err.field, "password");
    }

    #[test]
    fn non_blank_rejects_whitespace_only() {
        let err = require_non_blank("content", " \n\t ").unwrap_err();
        assert_eq!(err.to_string(), "invalid `content`: must not be blank");
        assert!(require_non_blank("content", " x ").is_ok());
    }
}
