// src/api/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::types::EnrolledIdentity;
use crate::core::services::verification::VerificationOutcome;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub challenge_id: Option<String>,
    /// `data:image/<type>;base64,<payload>`
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            distance: None,
            message: Some(message.into()),
        }
    }
}

impl From<&VerificationOutcome> for CheckResponse {
    fn from(outcome: &VerificationOutcome) -> Self {
        let message = match outcome {
            VerificationOutcome::Error { reason } => Some(reason.clone()),
            _ => None,
        };

        Self {
            status: outcome.status().to_string(),
            distance: outcome.distance(),
            message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrollRequest {
    #[serde(default)]
    pub descriptor: Option<Vec<f32>>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub subject_id: String,
    pub descriptor_length: usize,
    pub model: Option<String>,
    pub enrolled_at: DateTime<Utc>,
}

impl From<&EnrolledIdentity> for EnrollResponse {
    fn from(identity: &EnrolledIdentity) -> Self {
        Self {
            subject_id: identity.subject_id.to_string(),
            descriptor_length: identity.descriptor.len(),
            model: identity.model.clone(),
            enrolled_at: identity.enrolled_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
