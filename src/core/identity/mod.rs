pub mod descriptor;
pub mod types;

pub use descriptor::Descriptor;
pub use types::{AuditRecord, ChallengeId, EnrolledIdentity, SubjectId, FACE_MISMATCH_FLAG};
