//! # Certificate Store
//!
//! The storage abstraction over the external document store, and the
//! in-memory implementation used for development, tests, and as the
//! hydrated read path in front of PostgreSQL.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use attesta_core::CertificateId;

use crate::certificate::{Certificate, CertificateStatus, Revocation};

/// Storage-level failures. State-machine violations surface here because
/// the store is where the conditional writes happen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A certificate with this id already exists. Should not occur given
    /// the id generation scheme, but is always checked.
    #[error("certificate {0} already exists")]
    DuplicateId(CertificateId),

    /// No certificate with this id.
    #[error("certificate {0} not found")]
    NotFound(CertificateId),

    /// The certificate is already revoked; revocation is terminal and a
    /// second attempt is an error, not a no-op.
    #[error("certificate {0} is already revoked")]
    AlreadyRevoked(CertificateId),
}

/// Interface to the certificate document store.
///
/// Implementations must make [`revoke`](CertificateStore::revoke) a
/// conditional write: it succeeds only while the stored status is still
/// `active`, so of two racing revocations at most one wins and the loser
/// sees [`StoreError::AlreadyRevoked`].
pub trait CertificateStore: Send + Sync {
    /// Persist a new certificate. Fails with [`StoreError::DuplicateId`]
    /// if the id already exists.
    fn create(&self, certificate: Certificate) -> Result<(), StoreError>;

    /// Look up a certificate by id. A missing id is `None`, never an error.
    fn get(&self, id: &CertificateId) -> Option<Certificate>;

    /// Transition a certificate to `revoked`, stamping the revocation
    /// metadata. Conditional on the current status being `active`.
    fn revoke(&self, id: &CertificateId, revocation: Revocation)
        -> Result<Certificate, StoreError>;

    /// All stored certificates (administrative listing).
    fn list(&self) -> Vec<Certificate>;

    /// Number of stored certificates.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thread-safe in-memory certificate store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// The conditional revoke runs entirely under one write lock, so there is
/// no read-then-write race between the status check and the update.
#[derive(Debug, Default)]
pub struct MemoryCertificateStore {
    records: RwLock<HashMap<CertificateId, Certificate>>,
}

impl MemoryCertificateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record without the duplicate check. Used when hydrating
    /// from durable storage at startup.
    pub fn load(&self, certificate: Certificate) {
        self.records.write().insert(certificate.id, certificate);
    }
}

impl CertificateStore for MemoryCertificateStore {
    fn create(&self, certificate: Certificate) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&certificate.id) {
            return Err(StoreError::DuplicateId(certificate.id));
        }
        records.insert(certificate.id, certificate);
        Ok(())
    }

    fn get(&self, id: &CertificateId) -> Option<Certificate> {
        self.records.read().get(id).cloned()
    }

    fn revoke(
        &self,
        id: &CertificateId,
        revocation: Revocation,
    ) -> Result<Certificate, StoreError> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        if record.status == CertificateStatus::Revoked {
            return Err(StoreError::AlreadyRevoked(*id));
        }
        record.status = CertificateStatus::Revoked;
        record.revocation = Some(revocation);
        Ok(record.clone())
    }

    fn list(&self) -> Vec<Certificate> {
        self.records.read().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
