//! # Public Verification API
//!
//! Unauthenticated endpoints answering "is this certificate genuine and in
//! what state". Every response — including rate-limited rejections — is a
//! 200 with a `status` discriminator and the caller's rate-limit standing;
//! being told "no" is a normal outcome of a public integrity check, not an
//! error.
//!
//! - `POST /v1/verify` — Verify a certificate id from a JSON body.
//! - `GET  /v1/verify/:id` — Verify a certificate id from the path (the
//!   QR payload target).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use attesta_crypto::hash_address;
use attesta_registry::{AuditAction, PublicCertificate, PublicRevocation, VerificationOutcome};

use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::client_address;
use crate::state::AppState;

// ── Request / Response types ────────────────────────────────────

/// Request body for certificate verification.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct VerifyRequest {
    /// The certificate id to verify.
    pub certificate_id: String,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.certificate_id.trim().is_empty() {
            return Err("certificate_id must be non-empty".into());
        }
        if self.certificate_id.trim().len() > 100 {
            return Err("certificate_id must not exceed 100 characters".into());
        }
        Ok(())
    }
}

/// The caller's rate-limit standing, returned with every outcome.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitInfo {
    /// Attempts remaining in the current window.
    pub remaining: u64,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

/// Public projection of a certificate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicCertificateResponse {
    pub id: String,
    pub participant_name: String,
    pub program_name: String,
    pub category: String,
    pub date_of_participation: String,
    pub issued_at: DateTime<Utc>,
}

impl From<PublicCertificate> for PublicCertificateResponse {
    fn from(c: PublicCertificate) -> Self {
        Self {
            id: c.id.to_string(),
            participant_name: c.participant_name,
            program_name: c.program_name,
            category: c.category,
            date_of_participation: c.date_of_participation,
            issued_at: c.issued_at,
        }
    }
}

/// Public projection of revocation metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicRevocationResponse {
    pub reason: String,
    pub revoked_at: DateTime<Utc>,
}

impl From<PublicRevocation> for PublicRevocationResponse {
    fn from(r: PublicRevocation) -> Self {
        Self {
            reason: r.reason,
            revoked_at: r.revoked_at,
        }
    }
}

/// The verification result.
///
/// `status` is one of `valid`, `revoked`, `not_found`, `invalid`,
/// `rate_limited`. `certificate` is present for `valid` and `revoked`;
/// `revocation` only for `revoked`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PublicCertificateResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation: Option<PublicRevocationResponse>,
    pub rate_limit: RateLimitInfo,
}

// ── Router ──────────────────────────────────────────────────────

/// Build the public verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/verify", post(verify_certificate))
        .route("/v1/verify/:id", get(verify_certificate_by_path))
}

// ── Handlers ────────────────────────────────────────────────────

/// POST /v1/verify — Verify a certificate id.
#[utoipa::path(
    post,
    path = "/v1/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerifyResponse),
        (status = 422, description = "Malformed request", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_certificate(
    State(state): State<AppState>,
    metrics: Option<Extension<ApiMetrics>>,
    headers: HeaderMap,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let metrics = metrics.map(|Extension(m)| m);
    Ok(Json(
        run_verification(&state, metrics, &headers, req.certificate_id.trim()).await,
    ))
}

/// GET /v1/verify/:id — Verify a certificate id from the path.
///
/// This is the QR payload target, so a scanned certificate resolves
/// without a JSON client.
#[utoipa::path(
    get,
    path = "/v1/verify/{id}",
    params(("id" = String, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Verification outcome", body = VerifyResponse),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_certificate_by_path(
    State(state): State<AppState>,
    metrics: Option<Extension<ApiMetrics>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Json<VerifyResponse> {
    let metrics = metrics.map(|Extension(m)| m);
    Json(run_verification(&state, metrics, &headers, id.trim()).await)
}

/// Run the verification service and render the public response.
async fn run_verification(
    state: &AppState,
    metrics: Option<ApiMetrics>,
    headers: &HeaderMap,
    certificate_id: &str,
) -> VerifyResponse {
    let address = client_address(headers);
    let result = state.verifier.verify(certificate_id, &address);

    if let Some(m) = metrics {
        m.record_verification(result.outcome.as_str());
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::audit::append(
            pool,
            certificate_id,
            AuditAction::Verify.as_str(),
            None,
            &serde_json::json!({
                "outcome": result.outcome.as_str(),
                "requester": hash_address(&address),
            }),
        )
        .await
        {
            tracing::error!(error = %e, "failed to persist verify audit event");
        }
    }

    let status = result.outcome.as_str().to_string();
    let rate_limit = RateLimitInfo {
        remaining: result.rate_limit.remaining,
        reset_at: result.rate_limit.reset_at,
    };

    match result.outcome {
        VerificationOutcome::Valid { certificate } => VerifyResponse {
            status,
            certificate: Some(certificate.into()),
            revocation: None,
            rate_limit,
        },
        VerificationOutcome::Revoked {
            certificate,
            revocation,
        } => VerifyResponse {
            status,
            certificate: Some(certificate.into()),
            revocation: revocation.map(Into::into),
            rate_limit,
        },
        VerificationOutcome::RateLimited
        | VerificationOutcome::NotFound
        | VerificationOutcome::SignatureInvalid => VerifyResponse {
            status,
            certificate: None,
            revocation: None,
            rate_limit,
        },
    }
}

// ── Tests ───────────────────────────────────────────────────────
