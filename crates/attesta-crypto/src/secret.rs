//! # Signing Secret
//!
//! The server-held secret that keys certificate signatures. Loaded from a
//! hex-encoded environment value in production, or generated fresh for
//! development (certificates signed with an ephemeral secret stop verifying
//! after a restart).

use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Minimum accepted secret length in bytes.
///
/// Anything shorter is rejected at construction so that a weak key is a
/// startup failure, not a silently degraded deployment.
pub const MIN_SECRET_BYTES: usize = 16;

/// Number of bytes in a generated secret.
pub const GENERATED_SECRET_BYTES: usize = 32;

/// A server-held signing secret.
///
/// Does not implement `Serialize`, `Clone`, or a revealing `Debug` — key
/// material must not leak into logs, responses, or artifacts. The inner
/// bytes are zeroized when the secret is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret {
    bytes: Vec<u8>,
}

impl SigningSecret {
    /// Construct a secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SecretTooShort`] if fewer than
    /// [`MIN_SECRET_BYTES`] bytes are provided.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(CryptoError::SecretTooShort {
                min: MIN_SECRET_BYTES,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Construct a secret from a hex string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSecretHex`] on malformed hex and
    /// [`CryptoError::SecretTooShort`] if the decoded secret is too small.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex_to_bytes(hex.trim()).map_err(CryptoError::InvalidSecretHex)?;
        Self::from_bytes(bytes)
    }

    /// Generate a fresh random secret from the OS entropy source.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Access the raw secret bytes for MAC keying.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret(<redacted>)")
    }
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}
