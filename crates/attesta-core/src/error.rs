//! # Error Types
//!
//! Foundational error types shared across the stack. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts and measures must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Input validation failure — user-correctable.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required field is missing or empty after trimming.
    #[error("field '{0}' is required and must be non-empty")]
    MissingField(&'static str),

    /// A field exceeds its maximum length.
    #[error("field '{field}' exceeds {max} characters")]
    FieldTooLong {
        /// The offending field name.
        field: &'static str,
        /// The maximum allowed length.
        max: usize,
    },

    /// A certificate id string is not a valid identifier.
    #[error("invalid certificate id: {0}")]
    InvalidCertificateId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rejected_display() {
        let err = CanonicalizationError::FloatRejected(2.5);
        assert!(err.to_string().contains("2.5"));
    }

    #[test]
    fn missing_field_display() {
        let err = ValidationError::MissingField("participant_name");
        assert!(err.to_string().contains("participant_name"));
    }

    #[test]
    fn field_too_long_display() {
        let err = ValidationError::FieldTooLong {
            field: "program_name",
            max: 255,
        };
        let s = err.to_string();
        assert!(s.contains("program_name"));
        assert!(s.contains("255"));
    }
}
