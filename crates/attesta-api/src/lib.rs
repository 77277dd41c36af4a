//! # attesta-api — Axum API Service for the Attesta Stack
//!
//! Assembles the certificate console, public verification endpoint, and
//! operational surface into a single application.
//!
//! ## API Surface
//!
//! | Prefix                         | Module                  | Access      |
//! |--------------------------------|-------------------------|-------------|
//! | `POST/GET /v1/certificates/*`  | [`routes::certificates`]| Bearer auth |
//! | `POST /v1/verify`, `GET /v1/verify/:id` | [`routes::verify`] | Public  |
//! | `/openapi.json`                | [`openapi`]             | Bearer auth |
//! | `/health/*`, `/metrics`        | here                    | Public      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! Auth runs BEFORE the API-wide rate limiter so unauthenticated requests
//! are rejected without consuming quota. The public verification endpoint
//! sits outside the auth stack; its strict per-client limit is enforced
//! inside the verification service itself.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use attesta_registry::{AuditLog, CertificateStore};

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{ApiRateLimit, RateLimitConfig};
use crate::state::AppState;

pub use error::AppError;

/// Check if metrics are enabled via the `ATTESTA_METRICS_ENABLED` env var.
/// Defaults to `true` when absent or set to anything other than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("ATTESTA_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, `/metrics`, and the public verification endpoints are
/// mounted outside the auth middleware so they remain accessible without
/// credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = ApiRateLimit::new(RateLimitConfig::default());
    let metrics_on = metrics_enabled();

    // Authenticated console routes.
    //
    // Body size limit: 2 MiB — prevents OOM from oversized request bodies.
    let mut api = Router::new()
        .merge(routes::certificates::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .layer(Extension(limiter))
        .with_state(state.clone());

    // Unauthenticated surface: health probes, metrics scrape, and public
    // verification.
    let mut unauthenticated = Router::new()
        .merge(routes::verify::router())
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in Prometheus text
/// exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // Certificates by status.
    let certificates = state.certificates.list();
    let active = certificates.iter().filter(|c| c.is_active()).count();
    let revoked = certificates.len() - active;
    metrics.certificates_total().reset();
    metrics
        .certificates_total()
        .with_label_values(&["active"])
        .set(active as f64);
    metrics
        .certificates_total()
        .with_label_values(&["revoked"])
        .set(revoked as f64);

    // Audit trail size.
    metrics.audit_events_total().set(state.audit.len() as f64);

    // Signing secret mode.
    metrics
        .signing_secret_ephemeral()
        .set(if state.secret_ephemeral { 1.0 } else { 0.0 });

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - The signer produces verifiable signatures.
/// - In-memory stores are accessible (locks acquirable).
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify the signer is functional with a canary payload.
    let probe = serde_json::json!({"probe": "readiness"});
    let probe_id = attesta_core::CertificateId::new();
    match state.signer.signature_for(&probe, &probe_id) {
        Ok(signature) => {
            if !state.signer.verify(&probe, &probe_id, &signature.to_hex()) {
                return (StatusCode::SERVICE_UNAVAILABLE, "signer degraded").into_response();
            }
        }
        Err(e) => {
            tracing::warn!("Signer health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "signer degraded").into_response();
        }
    }

    // Verify stores are accessible.
    let _ = state.certificates.len();
    let _ = state.audit.len();

    // Verify database connection (when configured).
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn liveness_probe_is_public() {
        let app = app(AppState::new());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health/liveness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_probe_without_db_is_ready() {
        let app = app(AppState::new());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health/readiness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_certificate_gauges() {
        let state = AppState::new();
        state
            .issuer
            .issue(
                attesta_registry::CertificateFields {
                    participant_name: "Asha Rao".to_string(),
                    program_name: "SPUNK 2025".to_string(),
                    category: "bootcamp".to_string(),
                    date_of_participation: "2025-03-14".to_string(),
                },
                "admin",
            )
            .unwrap();

        let app = app(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("attesta_certificates_total"));
        assert!(text.contains("attesta_audit_events_total"));
    }
}
