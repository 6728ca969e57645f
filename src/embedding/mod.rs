// src/embedding/mod.rs
mod detector;
mod embedder;
mod recognizer;

use std::path::PathBuf;

use async_trait::async_trait;
use image::DynamicImage;
use thiserror::Error;

use crate::core::identity::descriptor::Descriptor;

pub use detector::{FaceBox, FaceDetector};
pub use embedder::OnnxFaceEmbedder;
pub use recognizer::{crop_face, FaceRecognizer};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Failed to load model {}: {}", .path.display(), .message)]
    ModelLoad { path: PathBuf, message: String },

    #[error("Models are not loaded")]
    NotReady,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderStatus {
    Loading,
    Ready,
    Failed(String),
}

/// Detects the most prominent face in a raster image and describes it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn status(&self) -> ProviderStatus;

    fn is_ready(&self) -> bool {
        matches!(self.status(), ProviderStatus::Ready)
    }

    /// Identifies the model pair; descriptors are only comparable within one id.
    fn model_id(&self) -> String;

    /// `Ok(None)` when the image holds no detectable face.
    async fn detect_and_describe(&self, image: DynamicImage) -> Result<Option<Descriptor>>;
}
