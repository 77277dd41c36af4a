//! # Identity Newtypes
//!
//! Identifier newtypes for the certificate domain. Each identifier is a
//! distinct type — a [`CertificateId`] cannot be confused with a bare UUID
//! or an arbitrary string at a call site.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// The opaque unique identifier of an issued certificate.
///
/// Generated at issuance, never reused. Backed by a UUIDv4, so it is always
/// valid by construction; parsing from a string validates the format.
/// The id is part of the signed payload, which binds a signature to exactly
/// one certificate and prevents replaying a valid signature against another
/// certificate's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(Uuid);

impl CertificateId {
    /// Generate a fresh random certificate identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a certificate identifier from its string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        s.trim()
            .parse::<Uuid>()
            .map(Self)
            .map_err(|e| ValidationError::InvalidCertificateId(e.to_string()))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CertificateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CertificateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
