// src/embedding/embedder.rs
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::{
    crop_face, EmbeddingError, EmbeddingProvider, FaceDetector, FaceRecognizer, ProviderStatus,
    Result,
};
use crate::core::identity::descriptor::Descriptor;
use crate::utils::config::ModelConfig;

struct LoadedModels {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl LoadedModels {
    fn load(config: &ModelConfig) -> Result<Self> {
        let detector = FaceDetector::load(
            &config.detector_path(),
            config.detector_input_width,
            config.detector_input_height,
            config.min_detection_confidence,
        )?;
        let recognizer = FaceRecognizer::load(&config.recognizer_path(), config.recognizer_input_size)?;

        Ok(Self { detector, recognizer })
    }

    fn describe_most_prominent(&self, image: &DynamicImage) -> Result<Option<Descriptor>> {
        let rgb = image.to_rgb8();

        let face = match self.detector.detect(&rgb)? {
            Some(face) => face,
            None => return Ok(None),
        };
        debug!(confidence = face.confidence, "Face detected");

        match crop_face(&rgb, &face) {
            Some(crop) => self.recognizer.describe(&crop).map(Some),
            None => Ok(None),
        }
    }
}

/// ONNX-backed provider. Models are loaded once; the outcome of that load,
/// success or failure, is fixed for the life of the process.
pub struct OnnxFaceEmbedder {
    config: ModelConfig,
    model_id: String,
    models: OnceCell<std::result::Result<Arc<LoadedModels>, String>>,
}

impl OnnxFaceEmbedder {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
            model_id: format!("{}+{}", config.detector_file, config.recognizer_file),
            models: OnceCell::new(),
        }
    }

    /// Loads both models on the blocking pool. Later calls are no-ops.
    pub async fn load(&self) {
        if self.models.initialized() {
            warn!("Model loading already completed");
            return;
        }

        info!("Loading face models from {}", self.config.directory.display());
        let config = self.config.clone();
        let loaded = tokio::task::spawn_blocking(move || LoadedModels::load(&config))
            .await
            .map_err(|e| EmbeddingError::Inference(format!("model loading task failed: {}", e)))
            .and_then(|result| result);

        let state = match loaded {
            Ok(models) => {
                info!(model = %self.model_id, "Face models loaded");
                Ok(Arc::new(models))
            }
            Err(e) => {
                error!("Failed to load face models: {}", e);
                Err(e.to_string())
            }
        };

        if self.models.set(state).is_err() {
            warn!("Model loading raced with another loader; keeping the first result");
        }
    }

    fn loaded(&self) -> Result<Arc<LoadedModels>> {
        match self.models.get() {
            Some(Ok(models)) => Ok(models.clone()),
            _ => Err(EmbeddingError::NotReady),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxFaceEmbedder {
    fn status(&self) -> ProviderStatus {
        match self.models.get() {
            None => ProviderStatus::Loading,
            Some(Ok(_)) => ProviderStatus::Ready,
            Some(Err(reason)) => ProviderStatus::Failed(reason.clone()),
        }
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn detect_and_describe(&self, image: DynamicImage) -> Result<Option<Descriptor>> {
        let models = self.loaded()?;

        tokio::task::spawn_blocking(move || models.describe_most_prominent(&image))
            .await
            .map_err(|e| EmbeddingError::Inference(format!("inference task failed: {}", e)))?
    }
}
