//! Audit event persistence — immutable hash chain.
//!
//! Every persisted event carries a SHA-256 hash chaining to the previous
//! event, forming a tamper-evident log. Rows are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use attesta_registry::{AuditAction, AuditEvent};

/// Hash value that anchors the start of the chain.
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Append an audit event to the immutable log.
///
/// Computes the event hash by chaining with the most recent event's hash.
pub async fn append(
    pool: &PgPool,
    entity_id: &str,
    action: &str,
    actor: Option<&str>,
    metadata: &serde_json::Value,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();

    let previous_hash: Option<String> =
        sqlx::query_scalar("SELECT event_hash FROM audit_events ORDER BY created_at DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;
    let prev = previous_hash.as_deref().unwrap_or(GENESIS_HASH);

    let hash_input = format!("{prev}{id}certificate{entity_id}{action}");
    let event_hash = sha256_hex(&hash_input);

    sqlx::query(
        "INSERT INTO audit_events (id, entity_type, entity_id, action, actor,
         metadata, previous_hash, event_hash, created_at)
         VALUES ($1, 'certificate', $2, $3, $4, $5, $6, $7, NOW())",
    )
    .bind(id)
    .bind(entity_id)
    .bind(action)
    .bind(actor)
    .bind(metadata)
    .bind(prev)
    .bind(&event_hash)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Query audit events for one entity, most recent first.
pub async fn events_for_entity(
    pool: &PgPool,
    entity_id: &str,
) -> Result<Vec<AuditEventRow>, sqlx::Error> {
    sqlx::query_as::<_, AuditEventRow>(
        "SELECT id, entity_type, entity_id, action, actor, metadata,
         previous_hash, event_hash, created_at
         FROM audit_events
         WHERE entity_type = 'certificate' AND entity_id = $1
         ORDER BY created_at DESC",
    )
    .bind(entity_id)
    .fetch_all(pool)
    .await
}

/// Load all audit events for startup hydration, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AuditEventRow>(
        "SELECT id, entity_type, entity_id, action, actor, metadata,
         previous_hash, event_hash, created_at
         FROM audit_events ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_event() {
            Some(event) => events.push(event),
            None => tracing::error!("skipping audit row with unknown action"),
        }
    }
    Ok(events)
}

/// Verify audit chain integrity by checking hash continuity.
pub async fn verify_chain_integrity(
    pool: &PgPool,
    limit: i64,
) -> Result<ChainIntegrityResult, sqlx::Error> {
    let events = sqlx::query_as::<_, AuditEventRow>(
        "SELECT id, entity_type, entity_id, action, actor, metadata,
         previous_hash, event_hash, created_at
         FROM audit_events ORDER BY created_at ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let total = events.len();
    let mut broken_links = 0;
    let mut last_hash: Option<&str> = None;

    for event in &events {
        if let Some(expected_prev) = last_hash {
            if event.previous_hash.as_deref() != Some(expected_prev) {
                broken_links += 1;
            }
        }
        last_hash = Some(&event.event_hash);
    }

    Ok(ChainIntegrityResult {
        total_events: total,
        broken_links,
        chain_valid: broken_links == 0,
    })
}

/// Result of chain integrity verification.
#[derive(Debug)]
pub struct ChainIntegrityResult {
    pub total_events: usize,
    pub broken_links: usize,
    pub chain_valid: bool,
}

/// Database row for audit events.
#[derive(sqlx::FromRow)]
pub struct AuditEventRow {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub actor: Option<String>,
    pub metadata: serde_json::Value,
    pub previous_hash: Option<String>,
    pub event_hash: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEventRow {
    /// Convert to the registry event type for in-memory hydration.
    fn into_event(self) -> Option<AuditEvent> {
        let action = match self.action.as_str() {
            "issue" => AuditAction::Issue,
            "revoke" => AuditAction::Revoke,
            "verify" => AuditAction::Verify,
            other => {
                tracing::warn!(action = %other, "unknown audit action in database");
                return None;
            }
        };

        Some(AuditEvent {
            id: self.id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action,
            actor: self.actor,
            timestamp: self.created_at,
            metadata: self.metadata,
        })
    }
}

/// Compute SHA-256 hex digest of an input string.
fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    result.iter().map(|b| format!("{b:02x}")).collect()
}
