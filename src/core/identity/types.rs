// src/core/identity/types.rs
use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Deserialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::descriptor::Descriptor;

/// Flag attached to audit records written when a live face does not match.
pub const FACE_MISMATCH_FLAG: &str = "Face mismatch";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl ChallengeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<String> for ChallengeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolledIdentity {
    pub subject_id: SubjectId,
    pub descriptor: Descriptor,
    /// Embedding model that produced `descriptor`; `None` when imported as-is.
    pub model: Option<String>,
    pub enrolled_at: DateTime<Utc>,
}

impl EnrolledIdentity {
    pub fn new(subject_id: SubjectId, descriptor: Descriptor, model: Option<String>) -> Self {
        Self {
            subject_id,
            descriptor,
            model,
            enrolled_at: Utc::now(),
        }
    }

    pub fn has_descriptor(&self) -> bool {
        !self.descriptor.is_empty()
    }

    /// Descriptors from different models live in different spaces.
    pub fn is_comparable_with(&self, model_id: &str) -> bool {
        match &self.model {
            Some(model) => model == model_id,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub subject_id: SubjectId,
    pub challenge_id: ChallengeId,
    pub flags: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new<I, S>(subject_id: SubjectId, challenge_id: ChallengeId, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            subject_id,
            challenge_id,
            flags: flags.into_iter().map(Into::into).collect(),
            timestamp: Utc::now(),
        }
    }

    pub fn face_mismatch(subject_id: SubjectId, challenge_id: ChallengeId) -> Self {
        Self::new(subject_id, challenge_id, [FACE_MISMATCH_FLAG])
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_mismatch_record() {
        let record = AuditRecord::face_mismatch(SubjectId::new("user-1"), ChallengeId::new("ch-9"));

        assert!(record.has_flag(FACE_MISMATCH_FLAG));
        assert_eq!(record.flags.len(), 1);
        assert_eq!(record.subject_id.as_str(), "user-1");
        assert_eq!(record.challenge_id.as_str(), "ch-9");
    }

    #[test]
    fn test_flags_are_a_set() {
        let record = AuditRecord::new(
            SubjectId::new("user-1"),
            ChallengeId::new("ch-1"),
            ["Face mismatch", "Face mismatch", "Tab switch"],
        );

        assert_eq!(record.flags.len(), 2);
    }

    #[test]
    fn test_model_comparability() {
        let descriptor = Descriptor::new(vec![0.0; 4]);
        let tagged = EnrolledIdentity::new(SubjectId::new("a"), descriptor.clone(), Some("m1".into()));
        let untagged = EnrolledIdentity::new(SubjectId::new("b"), descriptor, None);

        assert!(tagged.is_comparable_with("m1"));
        assert!(!tagged.is_comparable_with("m2"));
        assert!(untagged.is_comparable_with("anything"));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&SubjectId::new("64f0c2")).unwrap();
        assert_eq!(json, "\"64f0c2\"");
    }
}
