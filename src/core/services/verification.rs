// src/core/services/verification.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    core::{
        identity::types::{AuditRecord, ChallengeId, SubjectId},
        imaging::{self, ImageError},
    },
    embedding::EmbeddingProvider,
    storage::IdentityStore,
    utils::config::VerificationConfig,
};

/// Result of one verification. Exactly one variant per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VerificationOutcome {
    Ok { distance: f64 },
    Mismatch { distance: f64 },
    NoFaceDetected,
    Error { reason: String },
}

impl VerificationOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Ok { .. } => "ok",
            Self::Mismatch { .. } => "mismatch",
            Self::NoFaceDetected => "noface",
            Self::Error { .. } => "error",
        }
    }

    pub fn distance(&self) -> Option<f64> {
        match self {
            Self::Ok { distance } | Self::Mismatch { distance } => Some(*distance),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("models not loaded")]
    Unready,

    #[error(transparent)]
    BadImage(#[from] ImageError),

    #[error("identity has no enrolled descriptor")]
    UnknownIdentity,

    #[error("descriptors are not comparable: {0}")]
    Incomparable(String),

    #[error("embedding provider failure: {0}")]
    Provider(String),

    #[error("identity store failure: {0}")]
    Store(String),

    #[error("failed to record mismatch: {0}")]
    AuditWrite(String),

    #[error("verification timed out")]
    Timeout,
}

impl VerifyError {
    /// Text returned to the caller. Internal failures are not echoed back.
    pub fn public_message(&self) -> String {
        match self {
            Self::Provider(_) | Self::Store(_) => "server error".to_string(),
            Self::AuditWrite(_) => "failed to record mismatch".to_string(),
            other => other.to_string(),
        }
    }
}

/// Strict cutoff: a distance equal to the threshold does not match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    threshold: f64,
}

impl MatchPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn accepts(&self, distance: f64) -> bool {
        distance < self.threshold
    }
}

pub struct VerificationService {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn IdentityStore>,
    policy: MatchPolicy,
    timeout: Duration,
}

impl VerificationService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn IdentityStore>,
        config: &VerificationConfig,
    ) -> Self {
        Self {
            provider,
            store,
            policy: MatchPolicy::new(config.match_threshold),
            timeout: config.timeout(),
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Verifies raw image bytes against the subject's enrolled descriptor.
    pub async fn verify(
        &self,
        subject_id: &SubjectId,
        challenge_id: &ChallengeId,
        image: &[u8],
    ) -> VerificationOutcome {
        self.settle(subject_id, challenge_id, self.decide(subject_id, challenge_id, image))
            .await
    }

    /// Same as [`verify`](Self::verify) for a base64 data URL as sent by
    /// browsers. Readiness is checked before the payload is touched.
    pub async fn verify_data_url(
        &self,
        subject_id: &SubjectId,
        challenge_id: &ChallengeId,
        image: Option<&str>,
    ) -> VerificationOutcome {
        let decision = async {
            self.ensure_ready()?;
            let bytes = imaging::decode_data_url(image)?;
            self.decide(subject_id, challenge_id, &bytes).await
        };
        self.settle(subject_id, challenge_id, decision).await
    }

    async fn settle<F>(
        &self,
        subject_id: &SubjectId,
        challenge_id: &ChallengeId,
        decision: F,
    ) -> VerificationOutcome
    where
        F: Future<Output = Result<VerificationOutcome, VerifyError>>,
    {
        let result = match tokio::time::timeout(self.timeout, decision).await {
            Ok(result) => result,
            Err(_) => Err(VerifyError::Timeout),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    VerifyError::Provider(_) | VerifyError::Store(_) | VerifyError::AuditWrite(_) => {
                        error!(subject = %subject_id, challenge = %challenge_id, "Verification failed: {}", e)
                    }
                    _ => warn!(subject = %subject_id, challenge = %challenge_id, "Verification rejected: {}", e),
                }
                VerificationOutcome::Error { reason: e.public_message() }
            }
        }
    }

    fn ensure_ready(&self) -> Result<(), VerifyError> {
        if self.provider.is_ready() {
            Ok(())
        } else {
            Err(VerifyError::Unready)
        }
    }

    async fn decide(
        &self,
        subject_id: &SubjectId,
        challenge_id: &ChallengeId,
        image: &[u8],
    ) -> Result<VerificationOutcome, VerifyError> {
        self.ensure_ready()?;

        let raster = imaging::decode_raster(image)?;

        let live = match self
            .provider
            .detect_and_describe(raster)
            .await
            .map_err(|e| VerifyError::Provider(e.to_string()))?
        {
            Some(descriptor) => descriptor,
            None => {
                debug!(subject = %subject_id, "No face in submitted frame");
                return Ok(VerificationOutcome::NoFaceDetected);
            }
        };

        if subject_id.is_empty() {
            return Err(VerifyError::UnknownIdentity);
        }
        let identity = self
            .store
            .find_identity(subject_id)
            .await
            .map_err(|e| VerifyError::Store(e.to_string()))?
            .filter(|identity| identity.has_descriptor())
            .ok_or(VerifyError::UnknownIdentity)?;

        let model_id = self.provider.model_id();
        if !identity.is_comparable_with(&model_id) {
            return Err(VerifyError::Incomparable(format!(
                "enrolled with {}, live model is {}",
                identity.model.as_deref().unwrap_or("unknown"),
                model_id
            )));
        }

        let distance = live
            .euclidean_distance(&identity.descriptor)
            .ok_or_else(|| {
                VerifyError::Incomparable(format!(
                    "live descriptor has {} values, enrolled has {}",
                    live.len(),
                    identity.descriptor.len()
                ))
            })?;
        if !distance.is_finite() {
            return Err(VerifyError::Incomparable("distance is not finite".into()));
        }

        if self.policy.accepts(distance) {
            info!(subject = %subject_id, challenge = %challenge_id, distance, "Face verified");
            return Ok(VerificationOutcome::Ok { distance });
        }

        let record = AuditRecord::face_mismatch(subject_id.clone(), challenge_id.clone());
        self.store
            .append_audit_record(&record)
            .await
            .map_err(|e| VerifyError::AuditWrite(e.to_string()))?;

        warn!(
            subject = %subject_id,
            challenge = %challenge_id,
            distance,
            threshold = self.policy.threshold(),
            record = %record.id,
            "Face mismatch recorded"
        );
        Ok(VerificationOutcome::Mismatch { distance })
    }
}
