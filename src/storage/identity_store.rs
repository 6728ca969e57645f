// src/storage/identity_store.rs
use async_trait::async_trait;

use super::encrypted::Result;
use crate::core::identity::types::{AuditRecord, EnrolledIdentity, SubjectId};

/// Holds enrolled descriptors and the append-only audit history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_identity(&self, subject_id: &SubjectId) -> Result<Option<EnrolledIdentity>>;

    /// Replaces any previous enrollment for the subject.
    async fn save_identity(&self, identity: &EnrolledIdentity) -> Result<()>;

    /// Records are never updated or removed once appended.
    async fn append_audit_record(&self, record: &AuditRecord) -> Result<()>;

    /// Oldest first.
    async fn audit_records(&self, subject_id: &SubjectId) -> Result<Vec<AuditRecord>>;
}
