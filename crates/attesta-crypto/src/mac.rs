//! # Certificate Signing and Verification
//!
//! Produces and checks HMAC-SHA256 certificate signatures keyed by the
//! server-held [`SigningSecret`].
//!
//! ## Security Invariants
//!
//! - The MAC input is always `&CanonicalBytes` — the signing input is built
//!   here, from the certificate fields plus the generated id, through the
//!   canonical pipeline. Raw-byte signing is not expressible.
//! - The id is embedded in the signed payload, so a signature is valid for
//!   exactly one certificate.
//! - Verification recomputes the tag and compares with
//!   `subtle::ConstantTimeEq`. It returns `false` on any malformed input
//!   (bad hex, wrong length, unserializable fields) and never panics or
//!   errors — mismatch is a normal outcome of a public integrity check.
//!
//! ## Serde
//!
//! Signatures serialize/deserialize as lowercase hex strings.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use attesta_core::{CanonicalBytes, CertificateId};

use crate::error::CryptoError;
use crate::secret::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

/// An HMAC-SHA256 certificate signature (32 bytes).
///
/// Serializes as a 64-character lowercase hex string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CertificateSignature(pub [u8; 32]);

// ---------------------------------------------------------------------------
// CertificateSignature impls
// ---------------------------------------------------------------------------

impl CertificateSignature {
    /// Create a signature from raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte tag.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the signature as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a signature from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim().to_lowercase();
        if hex.len() != 64 {
            return Err(format!("signature hex must be 64 chars, got {}", hex.len()));
        }
        let bytes = hex_to_bytes(&hex)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for CertificateSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CertificateSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for CertificateSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CertificateSignature({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for CertificateSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// CertificateSigner
// ---------------------------------------------------------------------------

/// Signs and verifies certificates with the server-held secret.
///
/// A constructed signer always has a usable secret — secret validation
/// happens at [`SigningSecret`] construction, so a missing or weak secret
/// is a startup failure rather than a per-request one.
pub struct CertificateSigner {
    secret: SigningSecret,
}

impl CertificateSigner {
    /// Create a signer over the given secret.
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }

    /// Sign a set of certificate fields, generating a fresh identifier.
    ///
    /// The signing input is the canonical serialization of the fields with
    /// the generated id inserted under the `"id"` key. Returns the id and
    /// the signature over `fields ∪ {id}`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NonObjectPayload`] if the fields do not
    /// serialize to a JSON object, or a canonicalization error if they
    /// contain floats.
    pub fn sign(
        &self,
        fields: &impl Serialize,
    ) -> Result<(CertificateId, CertificateSignature), CryptoError> {
        let id = CertificateId::new();
        let signature = self.signature_for(fields, &id)?;
        Ok((id, signature))
    }

    /// Recompute the signature for existing fields and id.
    ///
    /// Used internally by [`verify`](Self::verify); exposed for callers
    /// that need the expected tag (e.g., store integrity sweeps).
    pub fn signature_for(
        &self,
        fields: &impl Serialize,
        id: &CertificateId,
    ) -> Result<CertificateSignature, CryptoError> {
        let canonical = signing_input(fields, id)?;
        Ok(self.mac(&canonical))
    }

    /// Verify a signature against certificate fields and id.
    ///
    /// Recomputes the tag over the same canonical serialization and
    /// compares in constant time. Returns `false` — never an error — on
    /// malformed hex, wrong-length signatures, or unserializable fields.
    pub fn verify(&self, fields: &impl Serialize, id: &CertificateId, signature: &str) -> bool {
        let provided = match CertificateSignature::from_hex(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let expected = match self.signature_for(fields, id) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        expected.0.as_slice().ct_eq(provided.0.as_slice()).into()
    }

    /// Compute the HMAC-SHA256 tag over canonical bytes.
    fn mac(&self, data: &CanonicalBytes) -> CertificateSignature {
        // HMAC accepts keys of any length; new_from_slice cannot fail here.
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(data.as_bytes());
        let tag = mac.finalize().into_bytes();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(tag.as_slice());
        CertificateSignature(bytes)
    }
}

impl std::fmt::Debug for CertificateSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CertificateSigner(<secret>)")
    }
}

/// Build the canonical signing input: the fields object with the id
/// inserted under the `"id"` key.
fn signing_input(
    fields: &impl Serialize,
    id: &CertificateId,
) -> Result<CanonicalBytes, CryptoError> {
    let mut value = serde_json::to_value(fields)
        .map_err(attesta_core::CanonicalizationError::SerializationFailed)?;
    match value.as_object_mut() {
        Some(obj) => {
            obj.insert("id".to_string(), serde_json::Value::String(id.to_string()));
        }
        None => return Err(CryptoError::NonObjectPayload),
    }
    Ok(CanonicalBytes::from_value(value)?)
}

// ---------------------------------------------------------------------------
// Hex utilities (no external hex crate dependency)
// ---------------------------------------------------------------------------

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
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
