//! Error types for cryptographic operations.

use thiserror::Error;

use attesta_core::CanonicalizationError;

/// Error in signing-key handling or signature production.
///
/// Verification has no error variant on purpose: a signature that fails to
/// verify — for any reason, including malformed input — is reported as
/// `false`, not as an error.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The signing secret is shorter than the minimum allowed length.
    #[error("signing secret must be at least {min} bytes, got {actual}")]
    SecretTooShort {
        /// Minimum secret length in bytes.
        min: usize,
        /// Actual provided length in bytes.
        actual: usize,
    },

    /// The signing secret hex string could not be decoded.
    #[error("invalid signing secret hex: {0}")]
    InvalidSecretHex(String),

    /// The fields to sign did not serialize to a JSON object.
    #[error("signing payload must serialize to a JSON object")]
    NonObjectPayload,

    /// Canonicalization of the signing payload failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
