// tests/common/mod.rs
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use facecheck::{
    api::ApiState,
    core::{
        identity::Descriptor,
        services::{
            enrollment::EnrollmentService, health::HealthService,
            verification::VerificationService,
        },
    },
    embedding::{EmbeddingProvider, ProviderStatus, Result as EmbeddingResult},
    storage::{EncryptedStore, IdentityStore},
    utils::{config::Config, metrics::Metrics},
};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use tempfile::TempDir;

pub const STUB_MODEL: &str = "stub-detector+stub-recognizer";

/// Describes a frame by its top-left pixel. A black pixel means no face.
pub struct StubEmbedder {
    status: Mutex<ProviderStatus>,
}

impl StubEmbedder {
    pub fn ready() -> Self {
        Self::with_status(ProviderStatus::Ready)
    }

    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status: Mutex::new(status),
        }
    }

    pub fn set_status(&self, status: ProviderStatus) {
        *self.status.lock() = status;
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn status(&self) -> ProviderStatus {
        self.status.lock().clone()
    }

    fn model_id(&self) -> String {
        STUB_MODEL.to_string()
    }

    async fn detect_and_describe(&self, image: DynamicImage) -> EmbeddingResult<Option<Descriptor>> {
        let rgb = image.to_rgb8();
        let pixel = rgb.get_pixel(0, 0);
        if pixel.0 == [0, 0, 0] {
            return Ok(None);
        }
        Ok(Some(Descriptor::new(
            pixel.0.iter().map(|c| *c as f32 / 255.0).collect(),
        )))
    }
}

pub struct TestContext {
    pub config: Config,
    pub embedder: Arc<StubEmbedder>,
    pub store: Arc<EncryptedStore>,
    pub state: ApiState,
    // Dropped last so the database directory outlives the store.
    _dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_embedder(StubEmbedder::ready())
    }

    pub fn with_embedder(embedder: StubEmbedder) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_data_dir(dir.path());

        let embedder = Arc::new(embedder);
        let store = Arc::new(EncryptedStore::open(&config.storage).unwrap());
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();
        let identities: Arc<dyn IdentityStore> = store.clone();
        let metrics = Arc::new(Metrics::new());

        let state = ApiState {
            verification: Arc::new(VerificationService::new(
                provider.clone(),
                identities.clone(),
                &config.verification,
            )),
            enrollment: Arc::new(EnrollmentService::new(provider.clone(), identities)),
            health: Arc::new(HealthService::new(
                provider,
                metrics.clone(),
                config.verification.match_threshold,
            )),
            metrics,
            max_request_size: config.server.max_request_size,
        };

        Self {
            config,
            embedder,
            store,
            state,
            _dir: dir,
        }
    }
}

pub fn png(color: [u8; 3]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb(color)))
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}

pub fn data_url(color: [u8; 3]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png(color)))
}
