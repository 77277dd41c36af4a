//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`metrics`]: Prometheus request metrics.
//! - [`rate_limit`]: API-wide per-client rate limiting.

pub mod metrics;
pub mod rate_limit;
