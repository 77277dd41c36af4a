//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attesta API",
        version = "0.3.2",
        description = "Certificate issuance, revocation, audit, and public verification for the Attesta stack.",
        license(name = "Apache-2.0")
    ),
    paths(
        // Certificate console
        crate::routes::certificates::issue_certificate,
        crate::routes::certificates::list_certificates,
        crate::routes::certificates::get_certificate,
        crate::routes::certificates::revoke_certificate,
        crate::routes::certificates::certificate_audit,
        // Public verification
        crate::routes::verify::verify_certificate,
        crate::routes::verify::verify_certificate_by_path,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Certificate DTOs
        crate::routes::certificates::IssueCertificateRequest,
        crate::routes::certificates::RevokeCertificateRequest,
        crate::routes::certificates::CertificateResponse,
        crate::routes::certificates::RevocationResponse,
        crate::routes::certificates::CertificateListResponse,
        crate::routes::certificates::AuditEventResponse,
        crate::routes::certificates::AuditTrailResponse,
        // Verification DTOs
        crate::routes::verify::VerifyRequest,
        crate::routes::verify::VerifyResponse,
        crate::routes::verify::PublicCertificateResponse,
        crate::routes::verify::PublicRevocationResponse,
        crate::routes::verify::RateLimitInfo,
    )),
    tags(
        (name = "certificates", description = "Certificate console — issuance, revocation, audit"),
        (name = "verification", description = "Public certificate verification"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router, serving the spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_includes_all_routes() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/v1/certificates"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/certificates/{id}/revoke"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/verify"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/verify/{id}"));
    }

    #[test]
    fn spec_serializes_to_json() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("Attesta API"));
    }
}
