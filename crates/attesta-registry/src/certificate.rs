//! # Certificate Records
//!
//! The certificate record and its projections. The descriptive fields are
//! write-once: the signature covers them together with the id, so any
//! post-issuance mutation would stop the record from verifying.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use attesta_core::{CertificateId, ValidationError};
use attesta_crypto::CertificateSignature;

/// Maximum length of any descriptive field.
const MAX_FIELD_LEN: usize = 255;

/// The immutable descriptive attributes of a certificate.
///
/// These fields — together with the id — form the signing input. They are
/// never updated after issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateFields {
    /// Full name of the participant the certificate attests.
    pub participant_name: String,
    /// The program or event completed.
    pub program_name: String,
    /// Program classification (e.g., "bootcamp", "workshop").
    pub category: String,
    /// Date of participation, as supplied by the issuing console.
    pub date_of_participation: String,
}

impl CertificateFields {
    /// Validate that every field is present, non-empty after trimming, and
    /// within length bounds. Trims all fields in place on success so the
    /// signed payload never carries incidental whitespace.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("participant_name", &mut self.participant_name),
            ("program_name", &mut self.program_name),
            ("category", &mut self.category),
            ("date_of_participation", &mut self.date_of_participation),
        ] {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                return Err(ValidationError::MissingField(name));
            }
            if trimmed.len() > MAX_FIELD_LEN {
                return Err(ValidationError::FieldTooLong {
                    field: name,
                    max: MAX_FIELD_LEN,
                });
            }
            *value = trimmed;
        }
        Ok(())
    }
}

/// Lifecycle status of a certificate.
///
/// `Revoked` is terminal — there is no transition back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    /// Issued and verifiable.
    Active,
    /// Withdrawn by an administrator; the reason is recorded.
    Revoked,
}

impl CertificateStatus {
    /// String representation used in storage and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Revocation metadata, present exactly when `status = revoked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    /// Why the certificate was withdrawn.
    pub reason: String,
    /// When the revocation happened (UTC).
    pub revoked_at: DateTime<Utc>,
    /// The administrator who revoked it.
    pub revoked_by: String,
}

/// A stored certificate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Opaque unique identifier, generated at issuance, never reused.
    pub id: CertificateId,
    /// The write-once descriptive attributes covered by the signature.
    #[serde(flatten)]
    pub fields: CertificateFields,
    /// Current lifecycle status.
    pub status: CertificateStatus,
    /// HMAC-SHA256 signature over the canonical fields plus id.
    pub signature: CertificateSignature,
    /// When the certificate was issued (UTC), set once.
    pub issued_at: DateTime<Utc>,
    /// Revocation metadata; `Some` exactly when `status` is `Revoked`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation: Option<Revocation>,
}

impl Certificate {
    /// Whether the certificate is currently active.
    pub fn is_active(&self) -> bool {
        self.status == CertificateStatus::Active
    }

    /// The public-safe projection served to anonymous verifiers.
    pub fn public_view(&self) -> PublicCertificate {
        PublicCertificate {
            id: self.id,
            participant_name: self.fields.participant_name.clone(),
            program_name: self.fields.program_name.clone(),
            category: self.fields.category.clone(),
            date_of_participation: self.fields.date_of_participation.clone(),
            issued_at: self.issued_at,
        }
    }
}

/// The public projection of a certificate.
///
/// Excludes the signature and any administrative metadata — the public
/// verifier learns what was attested and when, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCertificate {
    /// The certificate identifier.
    pub id: CertificateId,
    /// Full name of the participant.
    pub participant_name: String,
    /// The program or event completed.
    pub program_name: String,
    /// Program classification.
    pub category: String,
    /// Date of participation.
    pub date_of_participation: String,
    /// When the certificate was issued (UTC).
    pub issued_at: DateTime<Utc>,
}

/// The public projection of revocation metadata — reason and date only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRevocation {
    /// Why the certificate was withdrawn.
    pub reason: String,
    /// When the revocation happened (UTC).
    pub revoked_at: DateTime<Utc>,
}

impl From<&Revocation> for PublicRevocation {
    fn from(revocation: &Revocation) -> Self {
        Self {
            reason: revocation.reason.clone(),
            revoked_at: revocation.revoked_at,
        }
    }
}
