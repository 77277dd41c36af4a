//! # Issuance Service
//!
//! Creates new certificates: validate the fields, sign them together with a
//! fresh id, persist the record, and audit the action under the issuing
//! administrator's identity.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use attesta_core::ValidationError;
use attesta_crypto::CertificateSigner;

use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::certificate::{Certificate, CertificateFields, CertificateStatus};
use crate::error::RegistryError;
use crate::store::CertificateStore;

/// The result of a successful issuance: the full stored record plus the
/// QR payload — a URL embedding the id, rendered externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCertificate {
    /// The stored certificate, including id and signature.
    pub certificate: Certificate,
    /// Verification URL embedding the certificate id.
    pub qr_payload: String,
}

/// Orchestrates signer, store, and audit log to create certificates.
pub struct IssuanceService {
    signer: Arc<CertificateSigner>,
    store: Arc<dyn CertificateStore>,
    audit: Arc<dyn AuditLog>,
    public_base_url: String,
}

impl IssuanceService {
    /// Build the service over its collaborators. `public_base_url` is the
    /// externally reachable base for QR payloads.
    pub fn new(
        signer: Arc<CertificateSigner>,
        store: Arc<dyn CertificateStore>,
        audit: Arc<dyn AuditLog>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            store,
            audit,
            public_base_url: public_base_url.into(),
        }
    }

    /// Issue a certificate for the given fields on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for missing/empty fields or actor.
    /// - Store and signer errors are propagated unchanged.
    pub fn issue(
        &self,
        mut fields: CertificateFields,
        actor: &str,
    ) -> Result<IssuedCertificate, RegistryError> {
        if actor.trim().is_empty() {
            return Err(ValidationError::MissingField("actor").into());
        }
        fields.validate()?;

        let (id, signature) = self.signer.sign(&fields)?;
        let certificate = Certificate {
            id,
            fields,
            status: CertificateStatus::Active,
            signature,
            issued_at: Utc::now(),
            revocation: None,
        };

        self.store.create(certificate.clone())?;

        self.audit.append(AuditEvent::certificate(
            AuditAction::Issue,
            id.to_string(),
            Some(actor.trim().to_string()),
            serde_json::json!({
                "program_name": certificate.fields.program_name,
                "category": certificate.fields.category,
            }),
        ));

        tracing::info!(certificate_id = %id, actor = %actor.trim(), "certificate issued");

        Ok(IssuedCertificate {
            qr_payload: format!(
                "{}/verify/{id}",
                self.public_base_url.trim_end_matches('/')
            ),
            certificate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::store::MemoryCertificateStore;
    use attesta_crypto::SigningSecret;

    fn service() -> (IssuanceService, Arc<MemoryCertificateStore>, Arc<MemoryAuditLog>) {
        let store = Arc::new(MemoryCertificateStore::new());
        let audit = Arc::new(MemoryAuditLog::new());
        let signer = Arc::new(CertificateSigner::new(
            SigningSecret::from_hex(&"11".repeat(32)).unwrap(),
        ));
        let service = IssuanceService::new(
            signer,
            store.clone() as Arc<dyn CertificateStore>,
            audit.clone() as Arc<dyn AuditLog>,
            "https://certs.example.org",
        );
        (service, store, audit)
    }

    fn sample_fields() -> CertificateFields {
        CertificateFields {
            participant_name: "Asha Rao".to_string(),
            program_name: "SPUNK 2025".to_string(),
            category: "bootcamp".to_string(),
            date_of_participation: "2025-03-14".to_string(),
        }
    }

    #[test]
    fn issue_persists_and_audits() {
        let (service, store, audit) = service();
        let issued = service.issue(sample_fields(), "admin@agency").unwrap();

        assert_eq!(issued.certificate.status, CertificateStatus::Active);
        assert!(store.get(&issued.certificate.id).is_some());

        let events = audit.for_entity(&issued.certificate.id.to_string());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::Issue);
        assert_eq!(events[0].actor.as_deref(), Some("admin@agency"));
    }

    #[test]
    fn qr_payload_embeds_id() {
        let (service, _, _) = service();
        let issued = service.issue(sample_fields(), "admin").unwrap();
        assert_eq!(
            issued.qr_payload,
            format!("https://certs.example.org/verify/{}", issued.certificate.id)
        );
    }

    #[test]
    fn qr_payload_handles_trailing_slash_in_base() {
        let store = Arc::new(MemoryCertificateStore::new());
        let audit = Arc::new(MemoryAuditLog::new());
        let signer = Arc::new(CertificateSigner::new(
            SigningSecret::from_hex(&"11".repeat(32)).unwrap(),
        ));
        let service = IssuanceService::new(
            signer,
            store as Arc<dyn CertificateStore>,
            audit as Arc<dyn AuditLog>,
            "https://certs.example.org/",
        );
        let issued = service.issue(sample_fields(), "admin").unwrap();
        assert!(!issued.qr_payload.contains("org//"));
    }

    #[test]
    fn empty_field_rejected_without_side_effects() {
        let (service, store, audit) = service();
        let mut fields = sample_fields();
        fields.participant_name = "  ".to_string();

        let err = service.issue(fields, "admin").unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert!(store.is_empty());
        assert!(audit.is_empty());
    }

    #[test]
    fn empty_actor_rejected() {
        let (service, _, _) = service();
        let err = service.issue(sample_fields(), "   ").unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn signature_verifies_against_stored_fields() {
        let (service, _, _) = service();
        let signer = CertificateSigner::new(SigningSecret::from_hex(&"11".repeat(32)).unwrap());
        let issued = service.issue(sample_fields(), "admin").unwrap();
        assert!(signer.verify(
            &issued.certificate.fields,
            &issued.certificate.id,
            &issued.certificate.signature.to_hex(),
        ));
    }

    #[test]
    fn distinct_issues_get_distinct_ids() {
        let (service, _, _) = service();
        let a = service.issue(sample_fields(), "admin").unwrap();
        let b = service.issue(sample_fields(), "admin").unwrap();
        assert_ne!(a.certificate.id, b.certificate.id);
        assert_ne!(a.certificate.signature, b.certificate.signature);
    }
}
