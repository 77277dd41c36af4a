//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (certificates by status, audit events,
//! signing secret mode) are updated on each `/metrics` scrape (pull model)
//! — see the metrics handler in `lib.rs`. Verification outcomes are pushed
//! by the verify handler.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Verification outcomes (push model, recorded by the handler) --
    verifications_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    certificates_total: GaugeVec,
    audit_events_total: prometheus::Gauge,
    signing_secret_ephemeral: prometheus::Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("attesta_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "attesta_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("attesta_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let verifications_total = IntCounterVec::new(
            Opts::new(
                "attesta_verifications_total",
                "Public verification attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("metric can be created");

        let certificates_total = GaugeVec::new(
            Opts::new("attesta_certificates_total", "Certificates by status"),
            &["status"],
        )
        .expect("metric can be created");

        let audit_events_total =
            prometheus::Gauge::new("attesta_audit_events_total", "Total audit events recorded")
                .expect("metric can be created");

        let signing_secret_ephemeral = prometheus::Gauge::new(
            "attesta_signing_secret_ephemeral",
            "Whether the signing secret is ephemeral (1=ephemeral, 0=configured)",
        )
        .expect("metric can be created");

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn Collector>,
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(verifications_total.clone()),
            Box::new(certificates_total.clone()),
            Box::new(audit_events_total.clone()),
            Box::new(signing_secret_ephemeral.clone()),
        ] {
            registry.register(collector).expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                verifications_total,
                certificates_total,
                audit_events_total,
                signing_secret_ephemeral,
            }),
        }
    }

    /// Current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Current total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Record a public verification outcome (called by the verify handler).
    pub fn record_verification(&self, outcome: &str) {
        self.inner
            .verifications_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Access the certificates gauge for updating on scrape.
    pub fn certificates_total(&self) -> &GaugeVec {
        &self.inner.certificates_total
    }

    /// Access the audit events gauge for updating on scrape.
    pub fn audit_events_total(&self) -> &prometheus::Gauge {
        &self.inner.audit_events_total
    }

    /// Access the signing-secret mode gauge for updating on scrape.
    pub fn signing_secret_ephemeral(&self) -> &prometheus::Gauge {
        &self.inner.signing_secret_ephemeral
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    let mut total = 0u64;
    for mf in &counter.collect() {
        for m in mf.get_metric() {
            total += m.get_counter().get_value() as u64;
        }
    }
    total
}

/// Normalize a request path by replacing UUID segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else if segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn requests_and_errors_count_independently() {
        let m = ApiMetrics::new();
        for _ in 0..5 {
            m.record_request("GET", "/ok", 200, 0.01);
        }
        m.record_request("GET", "/fail", 500, 0.1);
        m.record_request("POST", "/fail", 404, 0.05);
        assert_eq!(m.requests(), 7);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 200, 0.01);
        m.record_verification("valid");
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("attesta_http_requests_total"));
        assert!(output.contains("attesta_verifications_total"));
    }

    #[test]
    fn domain_gauges_update() {
        let m = ApiMetrics::new();
        m.certificates_total().with_label_values(&["active"]).set(3.0);
        m.certificates_total().with_label_values(&["revoked"]).set(1.0);
        m.audit_events_total().set(42.0);
        m.signing_secret_ephemeral().set(1.0);

        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("attesta_certificates_total"));
        assert!(output.contains("attesta_audit_events_total"));
        assert!(output.contains("attesta_signing_secret_ephemeral"));
    }

    #[test]
    fn clone_shares_underlying_registry() {
        let m = ApiMetrics::new();
        let clone = m.clone();
        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(clone.requests(), 1);
    }

    #[test]
    fn normalize_path_replaces_uuids() {
        assert_eq!(
            normalize_path("/v1/certificates/550e8400-e29b-41d4-a716-446655440000/audit"),
            "/v1/certificates/{id}/audit"
        );
        assert_eq!(
            normalize_path("/v1/certificates/550e8400e29b41d4a716446655440000"),
            "/v1/certificates/{id}"
        );
        assert_eq!(normalize_path("/v1/verify"), "/v1/verify");
    }
}
