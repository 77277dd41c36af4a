//! # attesta-crypto — Keyed Signing Primitives
//!
//! Certificate signatures are HMAC-SHA256 tags computed with a server-held
//! secret over the canonical serialization of a certificate's immutable
//! fields plus its identifier. Verification recomputes the tag and compares
//! in constant time.
//!
//! ## Security Invariants
//!
//! - Signing input MUST be [`CanonicalBytes`](attesta_core::CanonicalBytes)
//!   — there is no way to MAC raw bytes through this crate's public API, so
//!   non-canonical data can never be signed.
//! - The signing secret is never serialized or logged. [`SigningSecret`]
//!   implements neither `Serialize` nor `Clone`, its `Debug` is redacted,
//!   and the key material is zeroized on drop.
//! - Tag comparison uses `subtle::ConstantTimeEq`. Verification failure is
//!   a `false` return, never an error — a forged or malformed signature is
//!   an expected outcome of a public integrity check.
//! - The certificate id is part of the signed payload, binding identity to
//!   content: a valid signature cannot be replayed against another
//!   certificate's fields.

pub mod address;
pub mod error;
pub mod mac;
pub mod secret;

pub use address::hash_address;
pub use error::CryptoError;
pub use mac::{CertificateSignature, CertificateSigner};
pub use secret::SigningSecret;
