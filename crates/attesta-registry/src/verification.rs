//! # Verification Service
//!
//! Answers "is this certificate genuine and in what state" for anonymous
//! public requests. One request walks a fixed sequence of gates:
//!
//! 1. **Rate limit** — cheapest rejection first, before any store access.
//! 2. **Existence** — nothing to verify if no record resolves.
//! 3. **Signature** — checked before status, so a forged id cannot learn
//!    whether a revoked certificate with that id exists.
//! 4. **Status** — active or revoked.
//!
//! Every attempt, including rate-limited rejections, emits a `verify`
//! audit event carrying the outcome and the hashed requester address.

use std::sync::Arc;

use attesta_core::CertificateId;
use attesta_crypto::{hash_address, CertificateSigner};

use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::certificate::{CertificateStatus, PublicCertificate, PublicRevocation};
use crate::rate_limit::{RateLimitDecision, RateLimiter};
use crate::store::CertificateStore;

/// The outcome of a single verification request.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Too many attempts from this client in the current window. No store
    /// access happened.
    RateLimited,
    /// The id resolves to no record (including malformed ids).
    NotFound,
    /// A record exists but its signature does not verify. Unreachable
    /// under normal operation; indicates tampering or a data-integrity
    /// fault.
    SignatureInvalid,
    /// The signature verifies but the certificate was revoked.
    Revoked {
        /// Public projection of the certificate.
        certificate: PublicCertificate,
        /// Public revocation metadata. Always present for records written
        /// by the revocation service.
        revocation: Option<PublicRevocation>,
    },
    /// The signature verifies and the certificate is active.
    Valid {
        /// Public projection of the certificate.
        certificate: PublicCertificate,
    },
}

impl VerificationOutcome {
    /// Stable string tag used in audit metadata and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::SignatureInvalid => "invalid",
            Self::Revoked { .. } => "revoked",
            Self::Valid { .. } => "valid",
        }
    }
}

/// A verification outcome plus the rate-limit standing of the requester.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    /// What the request learned about the certificate.
    pub outcome: VerificationOutcome,
    /// Remaining quota and window reset for this client.
    pub rate_limit: RateLimitDecision,
}

/// Orchestrates rate limiter, store, signer, and audit log for public
/// verification.
pub struct VerificationService {
    signer: Arc<CertificateSigner>,
    store: Arc<dyn CertificateStore>,
    audit: Arc<dyn AuditLog>,
    limiter: Arc<RateLimiter>,
    limit: u64,
    window_secs: u64,
}

impl VerificationService {
    /// Build the service. `limit` attempts per `window_secs` are allowed
    /// per hashed client address.
    pub fn new(
        signer: Arc<CertificateSigner>,
        store: Arc<dyn CertificateStore>,
        audit: Arc<dyn AuditLog>,
        limiter: Arc<RateLimiter>,
        limit: u64,
        window_secs: u64,
    ) -> Self {
        Self {
            signer,
            store,
            audit,
            limiter,
            limit,
            window_secs,
        }
    }

    /// Verify the certificate id presented by `client_address`.
    ///
    /// Never fails: every path produces an outcome. The raw client address
    /// is hashed immediately and only the hash is used for rate limiting
    /// and audit metadata.
    pub fn verify(&self, certificate_id: &str, client_address: &str) -> Verification {
        let requester = hash_address(client_address);
        let presented_id = certificate_id.trim().to_string();

        let rate_limit = self
            .limiter
            .check_and_increment(&requester, self.limit, self.window_secs);

        if !rate_limit.allowed {
            let outcome = VerificationOutcome::RateLimited;
            self.record(&presented_id, &requester, &outcome);
            return Verification { outcome, rate_limit };
        }

        // A malformed id resolves to no record; it must not be
        // distinguishable from an unknown one.
        let record = CertificateId::parse(&presented_id)
            .ok()
            .and_then(|id| self.store.get(&id));

        let certificate = match record {
            Some(certificate) => certificate,
            None => {
                let outcome = VerificationOutcome::NotFound;
                self.record(&presented_id, &requester, &outcome);
                return Verification { outcome, rate_limit };
            }
        };

        let signature_ok = self.signer.verify(
            &certificate.fields,
            &certificate.id,
            &certificate.signature.to_hex(),
        );

        if !signature_ok {
            tracing::error!(
                certificate_id = %certificate.id,
                "stored certificate failed signature verification — \
                 possible tampering or data-integrity fault"
            );
            let outcome = VerificationOutcome::SignatureInvalid;
            self.record(&presented_id, &requester, &outcome);
            return Verification { outcome, rate_limit };
        }

        let outcome = match certificate.status {
            CertificateStatus::Active => VerificationOutcome::Valid {
                certificate: certificate.public_view(),
            },
            CertificateStatus::Revoked => VerificationOutcome::Revoked {
                certificate: certificate.public_view(),
                revocation: certificate.revocation.as_ref().map(PublicRevocation::from),
            },
        };

        self.record(&presented_id, &requester, &outcome);
        Verification { outcome, rate_limit }
    }

    /// Emit the `verify` audit event for an attempt.
    fn record(&self, presented_id: &str, requester: &str, outcome: &VerificationOutcome) {
        self.audit.append(AuditEvent::certificate(
            AuditAction::Verify,
            presented_id,
            None,
            serde_json::json!({
                "outcome": outcome.as_str(),
                "requester": requester,
            }),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::certificate::CertificateFields;
    use crate::issuance::IssuanceService;
    use crate::revocation::RevocationService;
    use crate::store::MemoryCertificateStore;
    use attesta_crypto::SigningSecret;

    struct Fixture {
        issuer: IssuanceService,
        revoker: RevocationService,
        verifier: VerificationService,
        store: Arc<MemoryCertificateStore>,
        audit: Arc<MemoryAuditLog>,
    }

    fn fixture_with_limit(limit: u64, window_secs: u64) -> Fixture {
        let store = Arc::new(MemoryCertificateStore::new());
        let audit = Arc::new(MemoryAuditLog::new());
        let signer = Arc::new(CertificateSigner::new(
            SigningSecret::from_hex(&"5e".repeat(32)).unwrap(),
        ));
        let issuer = IssuanceService::new(
            signer.clone(),
            store.clone() as Arc<dyn CertificateStore>,
            audit.clone() as Arc<dyn AuditLog>,
            "https://certs.example.org",
        );
        let revoker = RevocationService::new(
            store.clone() as Arc<dyn CertificateStore>,
            audit.clone() as Arc<dyn AuditLog>,
        );
        let verifier = VerificationService::new(
            signer,
            store.clone() as Arc<dyn CertificateStore>,
            audit.clone() as Arc<dyn AuditLog>,
            Arc::new(RateLimiter::new()),
            limit,
            window_secs,
        );
        Fixture {
            issuer,
            revoker,
            verifier,
            store,
            audit,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_limit(5, 60)
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
    fn issue_then_verify_is_valid() {
        let f = fixture();
        let issued = f.issuer.issue(sample_fields(), "admin").unwrap();

        let result = f
            .verifier
            .verify(&issued.certificate.id.to_string(), "203.0.113.7");
        match result.outcome {
            VerificationOutcome::Valid { certificate } => {
                assert_eq!(certificate.participant_name, "Asha Rao");
                assert_eq!(certificate.id, issued.certificate.id);
            }
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    #[test]
    fn unknown_id_is_not_found_never_invalid() {
        let f = fixture();
        let result = f
            .verifier
            .verify(&CertificateId::new().to_string(), "203.0.113.7");
        assert_eq!(result.outcome, VerificationOutcome::NotFound);
    }

    #[test]
    fn malformed_id_is_not_found() {
        let f = fixture();
        let result = f.verifier.verify("definitely-not-a-uuid", "203.0.113.7");
        assert_eq!(result.outcome, VerificationOutcome::NotFound);
    }

    #[test]
    fn revoked_certificate_reports_reason() {
        let f = fixture();
        let issued = f.issuer.issue(sample_fields(), "admin").unwrap();
        f.revoker
            .revoke(&issued.certificate.id, "duplicate entry", "admin")
            .unwrap();

        let result = f
            .verifier
            .verify(&issued.certificate.id.to_string(), "203.0.113.7");
        match result.outcome {
            VerificationOutcome::Revoked { revocation, .. } => {
                assert_eq!(revocation.unwrap().reason, "duplicate entry");
            }
            other => panic!("expected Revoked, got {other:?}"),
        }
    }

    #[test]
    fn tampered_record_is_signature_invalid() {
        let f = fixture();
        let issued = f.issuer.issue(sample_fields(), "admin").unwrap();

        // Mutate an immutable field behind the store's back.
        let mut tampered = issued.certificate.clone();
        tampered.fields.participant_name = "Mallory".to_string();
        f.store.load(tampered);

        let result = f
            .verifier
            .verify(&issued.certificate.id.to_string(), "203.0.113.7");
        assert_eq!(result.outcome, VerificationOutcome::SignatureInvalid);
    }

    #[test]
    fn sixth_attempt_in_window_is_rate_limited() {
        let f = fixture_with_limit(5, 60);
        let id = CertificateId::new().to_string();

        for _ in 0..5 {
            let r = f.verifier.verify(&id, "203.0.113.7");
            assert_ne!(r.outcome, VerificationOutcome::RateLimited);
        }
        let sixth = f.verifier.verify(&id, "203.0.113.7");
        assert_eq!(sixth.outcome, VerificationOutcome::RateLimited);
        assert_eq!(sixth.rate_limit.remaining, 0);
    }

    #[test]
    fn rate_limit_is_per_client() {
        let f = fixture_with_limit(5, 60);
        let id = CertificateId::new().to_string();

        for _ in 0..6 {
            f.verifier.verify(&id, "203.0.113.7");
        }
        let other = f.verifier.verify(&id, "203.0.113.99");
        assert_ne!(other.outcome, VerificationOutcome::RateLimited);
    }

    #[test]
    fn attempt_after_window_elapses_is_allowed() {
        // window_secs = 0 → every attempt is a fresh window.
        let f = fixture_with_limit(1, 0);
        let id = CertificateId::new().to_string();

        f.verifier.verify(&id, "203.0.113.7");
        let again = f.verifier.verify(&id, "203.0.113.7");
        assert_ne!(again.outcome, VerificationOutcome::RateLimited);
    }

    #[test]
    fn every_attempt_is_audited_with_hashed_requester() {
        let f = fixture();
        let issued = f.issuer.issue(sample_fields(), "admin").unwrap();
        let id = issued.certificate.id.to_string();
        let before = f.audit.len();

        f.verifier.verify(&id, "203.0.113.7");

        let events = f.audit.for_entity(&id);
        assert_eq!(f.audit.len(), before + 1);
        let event = &events[0];
        assert_eq!(event.action, AuditAction::Verify);
        assert!(event.actor.is_none());
        assert_eq!(event.metadata["outcome"], "valid");
        let requester = event.metadata["requester"].as_str().unwrap();
        assert_eq!(requester, hash_address("203.0.113.7"));
        assert!(!requester.contains("203"));
    }

    #[test]
    fn rate_limited_attempt_is_audited_without_store_access() {
        let f = fixture_with_limit(1, 60);
        let id = CertificateId::new().to_string();

        f.verifier.verify(&id, "203.0.113.7");
        f.verifier.verify(&id, "203.0.113.7");

        let events = f.audit.for_entity(&id);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].metadata["outcome"], "rate_limited");
    }

    #[test]
    fn verification_does_not_mutate_the_certificate() {
        let f = fixture();
        let issued = f.issuer.issue(sample_fields(), "admin").unwrap();
        let id = issued.certificate.id;

        for _ in 0..3 {
            f.verifier.verify(&id.to_string(), "203.0.113.7");
        }
        assert_eq!(f.store.get(&id).unwrap(), issued.certificate);
    }

    #[test]
    fn outcome_tags_are_stable() {
        assert_eq!(VerificationOutcome::RateLimited.as_str(), "rate_limited");
        assert_eq!(VerificationOutcome::NotFound.as_str(), "not_found");
        assert_eq!(VerificationOutcome::SignatureInvalid.as_str(), "invalid");
    }
}
