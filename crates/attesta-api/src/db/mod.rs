//! # Database Persistence Layer
//!
//! PostgreSQL persistence for certificates and the audit log via SQLx.
//!
//! ## Architecture
//!
//! The database is **optional**. When `DATABASE_URL` is set, certificates
//! and audit events are persisted and the in-memory stores are hydrated
//! from PostgreSQL on startup. When absent, the API operates in
//! in-memory-only mode (suitable for development and testing).
//!
//! The in-memory stores remain the synchronous read path; handlers write
//! through here after a successful in-memory mutation.

pub mod audit;
pub mod certificates;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 Certificates and audit events will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
