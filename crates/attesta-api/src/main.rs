//! # attesta-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Attesta certificate stack.
//! Binds to a configurable port (default 8080).

use attesta_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let defaults = AppConfig::default();
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults.port);

    let config = AppConfig {
        port,
        auth_token: std::env::var("AUTH_TOKEN").ok(),
        public_base_url: std::env::var("ATTESTA_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}/v1")),
        verify_limit: std::env::var("ATTESTA_VERIFY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.verify_limit),
        verify_window_secs: std::env::var("ATTESTA_VERIFY_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.verify_window_secs),
    };

    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set — console endpoints are unauthenticated");
    }

    // Initialize database pool (optional — absent means in-memory only).
    let db_pool = attesta_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    // A misconfigured signing secret is a startup failure, not a runtime one.
    let state = AppState::try_with_config(config, db_pool).map_err(|e| {
        tracing::error!("Signing secret configuration failed: {e}");
        e
    })?;

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = attesta_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Attesta API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
