//! # API-Wide Rate Limiting
//!
//! A loose fixed-window limit across the administrative surface, keyed by
//! hashed client address. The public verification endpoint enforces its
//! own much stricter limit inside the verification service; this layer
//! only curbs gross abuse of the console API.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use attesta_crypto::hash_address;
use attesta_registry::RateLimiter;

use crate::error::{ErrorBody, ErrorDetail};

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window_secs: 60,
        }
    }
}

/// Shared limiter state injected into request extensions.
#[derive(Debug, Clone)]
pub struct ApiRateLimit {
    limiter: Arc<RateLimiter>,
    config: RateLimitConfig,
}

impl ApiRateLimit {
    /// Create a new API-wide limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new()),
            config,
        }
    }
}

/// The client network address as presented by the transport.
///
/// Takes the first `X-Forwarded-For` element when present (the service is
/// expected to run behind a proxy that sets it), falling back to
/// `"anonymous"`. Callers hash the result before storing or keying on it.
pub fn client_address(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Middleware that enforces the API-wide per-client rate limit.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<ApiRateLimit>().cloned();

    if let Some(rl) = limiter {
        let key = hash_address(&client_address(request.headers()));
        let decision =
            rl.limiter
                .check_and_increment(&key, rl.config.max_requests, rl.config.window_secs);

        if !decision.allowed {
            let body = ErrorBody {
                error: ErrorDetail {
                    code: "RATE_LIMITED".to_string(),
                    message: "rate limit exceeded".to_string(),
                    details: None,
                },
            };
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}
