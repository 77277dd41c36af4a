//! # Registry Error Taxonomy
//!
//! One error type across the three services. Store and crypto failures are
//! propagated unmodified; the transport layer owns the mapping to response
//! codes. Signature mismatch is deliberately absent — it is a verification
//! outcome, not an error.

use thiserror::Error;

use attesta_core::ValidationError;
use attesta_crypto::CryptoError;

use crate::store::StoreError;

/// Failures from the issuance, verification, and revocation services.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Bad input — user-correctable.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failure or state-machine violation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Signing-side failure (configuration or payload shape).
    #[error("signing failed: {0}")]
    Crypto(#[from] CryptoError),
}
