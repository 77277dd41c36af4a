//! # Certificate Console API
//!
//! Administrative endpoints for the certificate lifecycle:
//!
//! - `POST   /v1/certificates` — Issue a certificate (Admin).
//! - `GET    /v1/certificates` — List certificates (Auditor+).
//! - `GET    /v1/certificates/:id` — Fetch one certificate (Auditor+).
//! - `POST   /v1/certificates/:id/revoke` — Revoke (Admin).
//! - `GET    /v1/certificates/:id/audit` — Audit trail, most recent first
//!   (Auditor+).
//!
//! Handlers delegate to the registry services and write through to
//! PostgreSQL when a pool is configured. A failed durable write is logged
//! loudly but does not fail the request — the in-memory state already
//! changed and the response must reflect it.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use attesta_core::CertificateId;
use attesta_registry::{AuditAction, AuditLog, Certificate, CertificateFields, CertificateStore};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ── Request / Response types ────────────────────────────────────

/// Request body for certificate issuance.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct IssueCertificateRequest {
    /// Full name of the participant.
    pub participant_name: String,
    /// The program or event completed.
    pub program_name: String,
    /// Program classification (e.g., "bootcamp", "workshop").
    pub category: String,
    /// Date of participation.
    pub date_of_participation: String,
}

impl Validate for IssueCertificateRequest {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("participant_name", &self.participant_name),
            ("program_name", &self.program_name),
            ("category", &self.category),
            ("date_of_participation", &self.date_of_participation),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} must be non-empty"));
            }
            if value.trim().len() > 255 {
                return Err(format!("{name} must not exceed 255 characters"));
            }
        }
        Ok(())
    }
}

/// Request body for certificate revocation.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RevokeCertificateRequest {
    /// Why the certificate is being withdrawn.
    pub reason: String,
}

impl Validate for RevokeCertificateRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must be non-empty".into());
        }
        if self.reason.trim().len() > 500 {
            return Err("reason must not exceed 500 characters".into());
        }
        Ok(())
    }
}

/// Revocation metadata in administrative responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevocationResponse {
    pub reason: String,
    pub revoked_at: DateTime<Utc>,
    pub revoked_by: String,
}

/// A certificate as returned to the administrative console.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CertificateResponse {
    pub id: String,
    pub participant_name: String,
    pub program_name: String,
    pub category: String,
    pub date_of_participation: String,
    pub status: String,
    pub signature: String,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation: Option<RevocationResponse>,
    /// Verification URL embedding the certificate id.
    pub qr_payload: String,
}

impl CertificateResponse {
    fn from_certificate(certificate: &Certificate, public_base_url: &str) -> Self {
        Self {
            id: certificate.id.to_string(),
            participant_name: certificate.fields.participant_name.clone(),
            program_name: certificate.fields.program_name.clone(),
            category: certificate.fields.category.clone(),
            date_of_participation: certificate.fields.date_of_participation.clone(),
            status: certificate.status.as_str().to_string(),
            signature: certificate.signature.to_hex(),
            issued_at: certificate.issued_at,
            revocation: certificate.revocation.as_ref().map(|r| RevocationResponse {
                reason: r.reason.clone(),
                revoked_at: r.revoked_at,
                revoked_by: r.revoked_by.clone(),
            }),
            qr_payload: format!(
                "{}/verify/{}",
                public_base_url.trim_end_matches('/'),
                certificate.id
            ),
        }
    }
}

/// Paginated certificate listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CertificateListResponse {
    /// Total number of certificates in the store.
    pub total: usize,
    pub certificates: Vec<CertificateResponse>,
}

/// Pagination parameters for listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page size (default 50, max 500).
    pub limit: Option<usize>,
    /// Offset into the newest-first ordering.
    pub offset: Option<usize>,
}

/// One audit event in a trail response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEventResponse {
    pub id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// Audit trail for one certificate, most recent first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditTrailResponse {
    pub certificate_id: String,
    pub events: Vec<AuditEventResponse>,
}

// ── Router ──────────────────────────────────────────────────────

/// Build the certificate console router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/certificates",
            post(issue_certificate).get(list_certificates),
        )
        .route("/v1/certificates/:id", get(get_certificate))
        .route("/v1/certificates/:id/revoke", post(revoke_certificate))
        .route("/v1/certificates/:id/audit", get(certificate_audit))
}

// ── Handlers ────────────────────────────────────────────────────

/// POST /v1/certificates — Issue a new certificate.
#[utoipa::path(
    post,
    path = "/v1/certificates",
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Certificate issued", body = CertificateResponse),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn issue_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CertificateResponse>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let fields = CertificateFields {
        participant_name: req.participant_name,
        program_name: req.program_name,
        category: req.category,
        date_of_participation: req.date_of_participation,
    };

    let actor = caller.audit_actor();
    let issued = state.issuer.issue(fields, &actor)?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::certificates::insert(pool, &issued.certificate).await {
            tracing::error!(certificate_id = %issued.certificate.id, error = %e,
                "failed to persist issued certificate");
        }
        if let Err(e) = db::audit::append(
            pool,
            &issued.certificate.id.to_string(),
            AuditAction::Issue.as_str(),
            Some(&actor),
            &serde_json::json!({
                "program_name": issued.certificate.fields.program_name,
                "category": issued.certificate.fields.category,
            }),
        )
        .await
        {
            tracing::error!(error = %e, "failed to persist issue audit event");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(CertificateResponse::from_certificate(
            &issued.certificate,
            &state.config.public_base_url,
        )),
    ))
}

/// GET /v1/certificates — List certificates, newest first.
#[utoipa::path(
    get,
    path = "/v1/certificates",
    params(
        ("limit" = Option<usize>, Query, description = "Page size (default 50, max 500)"),
        ("offset" = Option<usize>, Query, description = "Offset into the newest-first ordering"),
    ),
    responses(
        (status = 200, description = "Certificate listing", body = CertificateListResponse),
    ),
    tag = "certificates"
)]
pub(crate) async fn list_certificates(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(query): Query<ListQuery>,
) -> Result<Json<CertificateListResponse>, AppError> {
    require_role(&caller, Role::Auditor)?;

    let limit = query.limit.unwrap_or(50).min(500);
    let offset = query.offset.unwrap_or(0);

    let mut all = state.certificates.list();
    all.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
    let total = all.len();

    let certificates = all
        .iter()
        .skip(offset)
        .take(limit)
        .map(|c| CertificateResponse::from_certificate(c, &state.config.public_base_url))
        .collect();

    Ok(Json(CertificateListResponse {
        total,
        certificates,
    }))
}

/// GET /v1/certificates/:id — Fetch one certificate.
#[utoipa::path(
    get,
    path = "/v1/certificates/{id}",
    params(("id" = Uuid, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Certificate record", body = CertificateResponse),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn get_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificateResponse>, AppError> {
    require_role(&caller, Role::Auditor)?;

    let certificate = state
        .certificates
        .get(&CertificateId::from_uuid(id))
        .ok_or_else(|| AppError::NotFound(format!("certificate {id} not found")))?;

    Ok(Json(CertificateResponse::from_certificate(
        &certificate,
        &state.config.public_base_url,
    )))
}

/// POST /v1/certificates/:id/revoke — Revoke a certificate.
///
/// Revocation is terminal and not idempotent: revoking an already-revoked
/// certificate returns 409 and leaves the original revocation metadata
/// untouched.
#[utoipa::path(
    post,
    path = "/v1/certificates/{id}/revoke",
    params(("id" = Uuid, Path, description = "Certificate ID")),
    request_body = RevokeCertificateRequest,
    responses(
        (status = 200, description = "Certificate revoked", body = CertificateResponse),
        (status = 404, description = "Certificate not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already revoked", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    tag = "certificates"
)]
pub(crate) async fn revoke_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RevokeCertificateRequest>, JsonRejection>,
) -> Result<Json<CertificateResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let certificate_id = CertificateId::from_uuid(id);
    let actor = caller.audit_actor();
    let certificate = state
        .revoker
        .revoke(&certificate_id, &req.reason, &actor)?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::certificates::mark_revoked(pool, &certificate).await {
            tracing::error!(certificate_id = %certificate_id, error = %e,
                "failed to persist revocation");
        }
        if let Err(e) = db::audit::append(
            pool,
            &certificate_id.to_string(),
            AuditAction::Revoke.as_str(),
            Some(&actor),
            &serde_json::json!({ "reason": req.reason.trim() }),
        )
        .await
        {
            tracing::error!(error = %e, "failed to persist revoke audit event");
        }
    }

    Ok(Json(CertificateResponse::from_certificate(
        &certificate,
        &state.config.public_base_url,
    )))
}

/// GET /v1/certificates/:id/audit — Audit trail, most recent first.
///
/// Includes public verification attempts against the id. An id that never
/// existed yields an empty trail, not an error — attempts against unknown
/// ids are themselves audited.
#[utoipa::path(
    get,
    path = "/v1/certificates/{id}/audit",
    params(("id" = Uuid, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Audit trail", body = AuditTrailResponse),
    ),
    tag = "certificates"
)]
pub(crate) async fn certificate_audit(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditTrailResponse>, AppError> {
    require_role(&caller, Role::Auditor)?;

    let entity_id = id.to_string();
    let events = state
        .audit
        .for_entity(&entity_id)
        .into_iter()
        .map(|e| AuditEventResponse {
            id: e.id.to_string(),
            action: e.action.as_str().to_string(),
            actor: e.actor,
            timestamp: e.timestamp,
            metadata: e.metadata,
        })
        .collect();

    Ok(Json(AuditTrailResponse {
        certificate_id: entity_id,
        events,
    }))
}

// ── Tests ───────────────────────────────────────────────────────
