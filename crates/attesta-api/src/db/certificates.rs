//! Certificate persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `certificates` table.
//! The revocation update is conditional on the stored status still being
//! `active`, matching the in-memory store's one-winner guarantee.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use attesta_core::CertificateId;
use attesta_crypto::CertificateSignature;
use attesta_registry::{Certificate, CertificateFields, CertificateStatus, Revocation};

/// Insert a newly issued certificate.
pub async fn insert(pool: &PgPool, certificate: &Certificate) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO certificates (id, participant_name, program_name, category,
         date_of_participation, status, signature, issued_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(certificate.id.as_uuid())
    .bind(&certificate.fields.participant_name)
    .bind(&certificate.fields.program_name)
    .bind(&certificate.fields.category)
    .bind(&certificate.fields.date_of_participation)
    .bind(certificate.status.as_str())
    .bind(certificate.signature.to_hex())
    .bind(certificate.issued_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a revocation. Conditional write: only rows still `active` are
/// updated, so a racing revocation cannot overwrite recorded metadata.
/// Returns whether a row was updated.
pub async fn mark_revoked(pool: &PgPool, certificate: &Certificate) -> Result<bool, sqlx::Error> {
    let revocation = match &certificate.revocation {
        Some(revocation) => revocation,
        None => {
            tracing::error!(certificate_id = %certificate.id,
                "mark_revoked called without revocation metadata");
            return Ok(false);
        }
    };

    let result = sqlx::query(
        "UPDATE certificates
         SET status = 'revoked', revocation_reason = $1, revoked_at = $2, revoked_by = $3
         WHERE id = $4 AND status = 'active'",
    )
    .bind(&revocation.reason)
    .bind(revocation.revoked_at)
    .bind(&revocation.revoked_by)
    .bind(certificate.id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all certificates for startup hydration, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Certificate>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CertificateRow>(
        "SELECT id, participant_name, program_name, category, date_of_participation,
         status, signature, issued_at, revocation_reason, revoked_at, revoked_by
         FROM certificates ORDER BY issued_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_record() {
            Some(record) => records.push(record),
            None => {
                tracing::error!("skipping certificate row with invalid status or signature");
            }
        }
    }
    Ok(records)
}

/// Database row for certificates.
#[derive(sqlx::FromRow)]
struct CertificateRow {
    id: Uuid,
    participant_name: String,
    program_name: String,
    category: String,
    date_of_participation: String,
    status: String,
    signature: String,
    issued_at: DateTime<Utc>,
    revocation_reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
}

impl CertificateRow {
    fn into_record(self) -> Option<Certificate> {
        let status = match self.status.as_str() {
            "active" => CertificateStatus::Active,
            "revoked" => CertificateStatus::Revoked,
            other => {
                tracing::warn!(status = %other, "unknown certificate status in database");
                return None;
            }
        };

        let signature = match CertificateSignature::from_hex(&self.signature) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(error = %e, "invalid signature hex in database");
                return None;
            }
        };

        let revocation = match (self.revocation_reason, self.revoked_at, self.revoked_by) {
            (Some(reason), Some(revoked_at), Some(revoked_by)) => Some(Revocation {
                reason,
                revoked_at,
                revoked_by,
            }),
            _ => None,
        };

        Some(Certificate {
            id: CertificateId::from_uuid(self.id),
            fields: CertificateFields {
                participant_name: self.participant_name,
                program_name: self.program_name,
                category: self.category,
                date_of_participation: self.date_of_participation,
            },
            status,
            signature,
            issued_at: self.issued_at,
            revocation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, signature: &str) -> CertificateRow {
        CertificateRow {
            id: Uuid::new_v4(),
            participant_name: "Asha Rao".to_string(),
            program_name: "SPUNK 2025".to_string(),
            category: "bootcamp".to_string(),
            date_of_participation: "2025-03-14".to_string(),
            status: status.to_string(),
            signature: signature.to_string(),
            issued_at: Utc::now(),
            revocation_reason: None,
            revoked_at: None,
            revoked_by: None,
        }
    }

    #[test]
    fn active_row_converts() {
        let record = row("active", &"ab".repeat(32)).into_record().unwrap();
        assert_eq!(record.status, CertificateStatus::Active);
        assert!(record.revocation.is_none());
    }

    #[test]
    fn unknown_status_is_skipped() {
        assert!(row("pending", &"ab".repeat(32)).into_record().is_none());
    }

    #[test]
    fn invalid_signature_is_skipped() {
        assert!(row("active", "not-hex").into_record().is_none());
    }

    #[test]
    fn revoked_row_carries_metadata() {
        let mut r = row("revoked", &"ab".repeat(32));
        r.revocation_reason = Some("duplicate entry".to_string());
        r.revoked_at = Some(Utc::now());
        r.revoked_by = Some("admin".to_string());

        let record = r.into_record().unwrap();
        assert_eq!(record.status, CertificateStatus::Revoked);
        assert_eq!(record.revocation.unwrap().reason, "duplicate entry");
    }

    #[test]
    fn revoked_row_with_partial_metadata_has_no_revocation() {
        let mut r = row("revoked", &"ab".repeat(32));
        r.revocation_reason = Some("duplicate entry".to_string());
        // revoked_at / revoked_by missing
        let record = r.into_record().unwrap();
        assert!(record.revocation.is_none());
    }
}
