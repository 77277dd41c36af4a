//! # Audit Log
//!
//! Append-only records of issuance, revocation, and verification events.
//! Events are created exclusively by the service performing the action, in
//! the same logical operation as the state change they record (best-effort
//! ordering, not transactional). Entries are never mutated or deleted.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity type tag for certificate audit events.
pub const ENTITY_CERTIFICATE: &str = "certificate";

/// The action an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A certificate was issued.
    Issue,
    /// A certificate was revoked.
    Revoke,
    /// A public verification attempt was made (any outcome).
    Verify,
}

impl AuditAction {
    /// String representation used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Revoke => "revoke",
            Self::Verify => "verify",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable audit event.
///
/// `entity_id` is the id string as presented by the caller — verification
/// attempts against malformed or unknown ids are still recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// The kind of entity the event refers to (currently always
    /// [`ENTITY_CERTIFICATE`]).
    pub entity_type: String,
    /// The entity id as presented by the caller.
    pub entity_id: String,
    /// What happened.
    pub action: AuditAction,
    /// The administrator who performed the action; `None` for anonymous
    /// public verification.
    pub actor: Option<String>,
    /// When the event was recorded (UTC).
    pub timestamp: DateTime<Utc>,
    /// Action-specific detail: revocation reason, verification outcome,
    /// hashed requester address. Never raw client addresses.
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    /// Create a certificate audit event stamped with the current time.
    pub fn certificate(
        action: AuditAction,
        entity_id: impl Into<String>,
        actor: Option<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type: ENTITY_CERTIFICATE.to_string(),
            entity_id: entity_id.into(),
            action,
            actor,
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Append-only audit sink.
///
/// Implementations must preserve append order; [`for_entity`]
/// (AuditLog::for_entity) returns the most recent event first.
pub trait AuditLog: Send + Sync {
    /// Append an event. Infallible at this boundary — a failed durable
    /// write is the implementation's concern to log, not the caller's to
    /// handle mid-operation.
    fn append(&self, event: AuditEvent);

    /// Events for one entity id, most recent first.
    fn for_entity(&self, entity_id: &str) -> Vec<AuditEvent>;

    /// Total number of recorded events.
    fn len(&self) -> usize;

    /// Whether the log is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory append-only audit log.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in append order. Test and metrics helper.
    pub fn entries(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, event: AuditEvent) {
        self.events.write().push(event);
    }

    fn for_entity(&self, entity_id: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .rev()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.events.read().len()
    }
}
