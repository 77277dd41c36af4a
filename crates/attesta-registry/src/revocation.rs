//! # Revocation Service
//!
//! Transitions a certificate to `revoked` and records why. Revocation is
//! terminal and deliberately not idempotent: a second attempt fails with
//! `AlreadyRevoked` so that repeated accidental calls surface instead of
//! silently succeeding.

use std::sync::Arc;

use chrono::Utc;

use attesta_core::{CertificateId, ValidationError};

use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::certificate::{Certificate, Revocation};
use crate::error::RegistryError;
use crate::store::CertificateStore;

/// Maximum accepted length of a revocation reason.
const MAX_REASON_LEN: usize = 500;

/// Orchestrates the store and audit log for certificate revocation.
pub struct RevocationService {
    store: Arc<dyn CertificateStore>,
    audit: Arc<dyn AuditLog>,
}

impl RevocationService {
    /// Build the service over its collaborators.
    pub fn new(store: Arc<dyn CertificateStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Revoke a certificate for `reason` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for an empty reason or actor.
    /// - `NotFound` / `AlreadyRevoked` from the store's conditional write,
    ///   propagated unchanged. The losing side of two racing revocations
    ///   receives `AlreadyRevoked`.
    pub fn revoke(
        &self,
        id: &CertificateId,
        reason: &str,
        actor: &str,
    ) -> Result<Certificate, RegistryError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingField("reason").into());
        }
        if reason.len() > MAX_REASON_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "reason",
                max: MAX_REASON_LEN,
            }
            .into());
        }
        let actor = actor.trim();
        if actor.is_empty() {
            return Err(ValidationError::MissingField("actor").into());
        }

        let revocation = Revocation {
            reason: reason.to_string(),
            revoked_at: Utc::now(),
            revoked_by: actor.to_string(),
        };

        let certificate = self.store.revoke(id, revocation)?;

        self.audit.append(AuditEvent::certificate(
            AuditAction::Revoke,
            id.to_string(),
            Some(actor.to_string()),
            serde_json::json!({ "reason": reason }),
        ));

        tracing::info!(certificate_id = %id, actor = %actor, "certificate revoked");

        Ok(certificate)
    }
}
