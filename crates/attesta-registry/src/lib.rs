//! # attesta-registry — Certificate Registry Domain
//!
//! The domain layer of the Attesta stack. Defines the certificate record
//! and its lifecycle, the storage and audit abstractions, fixed-window rate
//! limiting, and the three services that orchestrate them:
//!
//! - [`IssuanceService`] — validate → sign → persist → audit.
//! - [`VerificationService`] — rate limit → lookup → verify signature →
//!   report status, auditing every attempt.
//! - [`RevocationService`] — conditional status transition → audit.
//!
//! ## Lifecycle
//!
//! A certificate is `active` from issuance until revocation and `revoked`
//! terminally afterwards — there is no un-revoke, and a second revocation
//! attempt is an error so that repeated accidental calls surface.
//!
//! ## Crate Policy
//!
//! - No HTTP types here; transport mapping lives in `attesta-api`.
//! - Stores are traits so the API layer can back them with PostgreSQL
//!   write-through while tests run against the in-memory implementations.

pub mod audit;
pub mod certificate;
pub mod error;
pub mod issuance;
pub mod rate_limit;
pub mod revocation;
pub mod store;
pub mod verification;

pub use audit::{AuditAction, AuditEvent, AuditLog, MemoryAuditLog};
pub use certificate::{
    Certificate, CertificateFields, CertificateStatus, PublicCertificate, PublicRevocation,
    Revocation,
};
pub use error::RegistryError;
pub use issuance::{IssuanceService, IssuedCertificate};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use revocation::RevocationService;
pub use store::{CertificateStore, MemoryCertificateStore, StoreError};
pub use verification::{Verification, VerificationOutcome, VerificationService};
