//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! ## Architecture
//!
//! The in-memory store and audit log are the synchronous read path; when a
//! PostgreSQL pool is configured they are hydrated from the database at
//! startup and written through after each successful mutation. The three
//! registry services share the same store, audit log, and signer.

use std::sync::Arc;

use sqlx::PgPool;

use attesta_crypto::{CertificateSigner, CryptoError, SigningSecret};
use attesta_registry::{
    AuditLog, CertificateStore, IssuanceService, MemoryAuditLog, MemoryCertificateStore,
    RateLimiter, RevocationService, VerificationService,
};

/// Default number of public verification attempts per window.
pub const DEFAULT_VERIFY_LIMIT: u64 = 5;

/// Default public verification window in seconds.
pub const DEFAULT_VERIFY_WINDOW_SECS: u64 = 60;

/// Application configuration.
///
/// Custom `Debug` redacts the auth token to prevent credential leakage.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Externally reachable base URL embedded in QR payloads.
    pub public_base_url: String,
    /// Public verification attempts allowed per window per client.
    pub verify_limit: u64,
    /// Public verification window length in seconds.
    pub verify_window_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("public_base_url", &self.public_base_url)
            .field("verify_limit", &self.verify_limit)
            .field("verify_window_secs", &self.verify_window_secs)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            public_base_url: "http://localhost:8080/v1".to_string(),
            verify_limit: DEFAULT_VERIFY_LIMIT,
            verify_window_secs: DEFAULT_VERIFY_WINDOW_SECS,
        }
    }
}

/// Load the signing secret from the environment, or generate one for
/// development.
///
/// In production, `ATTESTA_SIGNING_SECRET_HEX` provides the hex-encoded
/// secret (at least 32 hex chars). When the variable is absent a fresh
/// secret is generated and a warning logged — certificates signed with an
/// ephemeral secret stop verifying after a restart.
///
/// Returns `Err` if the variable is set but invalid, so a misconfigured
/// deployment fails at startup instead of issuing unverifiable
/// certificates.
fn load_or_generate_secret() -> Result<(SigningSecret, bool), CryptoError> {
    match std::env::var("ATTESTA_SIGNING_SECRET_HEX") {
        Ok(hex) => Ok((SigningSecret::from_hex(&hex)?, false)),
        Err(_) => {
            tracing::warn!(
                "ATTESTA_SIGNING_SECRET_HEX not set — generating ephemeral secret. \
                 Certificates signed with this secret will not verify after restart."
            );
            Ok((SigningSecret::generate(), true))
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals.
#[derive(Clone)]
pub struct AppState {
    /// In-memory certificate store (hydrated from the database when one is
    /// configured).
    pub certificates: Arc<MemoryCertificateStore>,
    /// In-memory audit log.
    pub audit: Arc<MemoryAuditLog>,
    /// Issuance orchestration.
    pub issuer: Arc<IssuanceService>,
    /// Public verification orchestration.
    pub verifier: Arc<VerificationService>,
    /// Revocation orchestration.
    pub revoker: Arc<RevocationService>,
    /// The certificate signer, shared by the services. Held here so the
    /// readiness probe can exercise it.
    pub signer: Arc<CertificateSigner>,
    /// PostgreSQL pool for durable persistence; `None` means in-memory
    /// only mode.
    pub db_pool: Option<PgPool>,
    /// Whether the signing secret was generated rather than configured.
    pub secret_ephemeral: bool,
    /// Application configuration.
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("certificates", &self.certificates.len())
            .field("audit_events", &self.audit.len())
            .field("db_pool", &self.db_pool.is_some())
            .field("secret_ephemeral", &self.secret_ephemeral)
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// Create application state with default configuration and no database.
    ///
    /// # Panics
    ///
    /// Panics if `ATTESTA_SIGNING_SECRET_HEX` is set but invalid. Prefer
    /// [`AppState::try_with_config`] in production startup paths.
    pub fn new() -> Self {
        Self::try_with_config(AppConfig::default(), None)
            .expect("failed to initialize AppState (check ATTESTA_SIGNING_SECRET_HEX)")
    }

    /// Create application state, returning `Err` on an invalid configured
    /// signing secret.
    pub fn try_with_config(config: AppConfig, db_pool: Option<PgPool>) -> Result<Self, CryptoError> {
        let (secret, secret_ephemeral) = load_or_generate_secret()?;
        let signer = Arc::new(CertificateSigner::new(secret));

        let certificates = Arc::new(MemoryCertificateStore::new());
        let audit = Arc::new(MemoryAuditLog::new());
        let limiter = Arc::new(RateLimiter::new());

        let store_dyn = Arc::clone(&certificates) as Arc<dyn CertificateStore>;
        let audit_dyn = Arc::clone(&audit) as Arc<dyn AuditLog>;

        let issuer = Arc::new(IssuanceService::new(
            Arc::clone(&signer),
            Arc::clone(&store_dyn),
            Arc::clone(&audit_dyn),
            config.public_base_url.clone(),
        ));
        let verifier = Arc::new(VerificationService::new(
            Arc::clone(&signer),
            Arc::clone(&store_dyn),
            Arc::clone(&audit_dyn),
            limiter,
            config.verify_limit,
            config.verify_window_secs,
        ));
        let revoker = Arc::new(RevocationService::new(store_dyn, audit_dyn));

        Ok(Self {
            certificates,
            audit,
            issuer,
            verifier,
            revoker,
            signer,
            db_pool,
            secret_ephemeral,
            config,
        })
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a pool is available. Loads persisted
    /// certificates and audit events so reads remain fast and synchronous.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let certificates = crate::db::certificates::load_all(pool)
            .await
            .map_err(|e| format!("failed to load certificates: {e}"))?;
        let certificate_count = certificates.len();
        for record in certificates {
            self.certificates.load(record);
        }

        let events = crate::db::audit::load_all(pool)
            .await
            .map_err(|e| format!("failed to load audit events: {e}"))?;
        let event_count = events.len();
        for event in events {
            self.audit.append(event);
        }

        tracing::info!(
            certificates = certificate_count,
            audit_events = event_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attesta_registry::CertificateFields;

    fn sample_fields() -> CertificateFields {
        CertificateFields {
            participant_name: "Asha Rao".to_string(),
            program_name: "SPUNK 2025".to_string(),
            category: "bootcamp".to_string(),
            date_of_participation: "2025-03-14".to_string(),
        }
    }

    #[test]
    fn app_state_new_starts_empty() {
        let state = AppState::new();
        assert!(state.certificates.is_empty());
        assert!(state.audit.is_empty());
        assert!(state.db_pool.is_none());
    }

    #[test]
    fn app_state_uses_default_config() {
        let state = AppState::new();
        assert_eq!(state.config.port, 8080);
        assert_eq!(state.config.verify_limit, DEFAULT_VERIFY_LIMIT);
        assert!(state.config.auth_token.is_none());
    }

    #[test]
    fn services_share_one_store() {
        let state = AppState::new();
        let issued = state.issuer.issue(sample_fields(), "admin").unwrap();
        assert!(state.certificates.get(&issued.certificate.id).is_some());
        assert_eq!(state.audit.len(), 1);
    }

    #[test]
    fn issue_then_verify_through_shared_services() {
        let state = AppState::new();
        let issued = state.issuer.issue(sample_fields(), "admin").unwrap();
        let result = state
            .verifier
            .verify(&issued.certificate.id.to_string(), "203.0.113.1");
        assert_eq!(result.outcome.as_str(), "valid");
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("hunter2".to_string()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn clone_shares_stores() {
        let state = AppState::new();
        let clone = state.clone();
        state.issuer.issue(sample_fields(), "admin").unwrap();
        assert_eq!(clone.certificates.len(), 1);
    }
}
