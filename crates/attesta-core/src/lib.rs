#![deny(missing_docs)]

//! # attesta-core — Foundational Types for the Attesta Stack
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies — only `serde`, `serde_json`,
//! `thiserror`, `chrono`, `uuid`, and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`CertificateId`] is a
//!    distinct type, not a bare string or UUID.
//!
//! 2. **[`CanonicalBytes`] is the sole path to signing and digest input.**
//!    Every signature and content digest in the stack flows through
//!    `CanonicalBytes::new()`, which applies deterministic serialization
//!    (sorted keys, compact separators, float rejection) before any byte
//!    leaves this crate.
//!
//! 3. **Structured errors with `thiserror`.** No `Box<dyn Error>`, no
//!    `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::CertificateId;
pub use temporal::Timestamp;
