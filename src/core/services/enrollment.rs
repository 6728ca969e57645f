// src/core/services/enrollment.rs
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    core::{
        identity::{
            descriptor::Descriptor,
            types::{AuditRecord, EnrolledIdentity, SubjectId},
        },
        imaging::{self, ImageError},
    },
    embedding::EmbeddingProvider,
    storage::IdentityStore,
};

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("models not loaded")]
    Unready,

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    BadImage(#[from] ImageError),

    #[error("no face detected in enrollment image")]
    NoFace,

    #[error("embedding provider failure: {0}")]
    Provider(String),

    #[error("identity store failure: {0}")]
    Store(String),
}

#[derive(Debug, Clone)]
pub enum EnrollmentSource {
    /// Descriptor computed elsewhere; stored without a model tag.
    Descriptor(Vec<f32>),
    /// Raw image bytes to run through the embedding provider.
    Image(Vec<u8>),
}

pub struct EnrollmentService {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn IdentityStore>,
}

impl EnrollmentService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn IdentityStore>) -> Self {
        Self { provider, store }
    }

    pub async fn enroll(
        &self,
        subject_id: SubjectId,
        source: EnrollmentSource,
    ) -> Result<EnrolledIdentity, EnrollError> {
        if subject_id.is_empty() {
            return Err(EnrollError::InvalidInput("subject id must not be empty".into()));
        }

        let (descriptor, model) = match source {
            EnrollmentSource::Descriptor(values) => {
                let descriptor = Descriptor::new(values);
                if descriptor.is_empty() {
                    return Err(EnrollError::InvalidInput("descriptor must not be empty".into()));
                }
                if !descriptor.is_finite() {
                    return Err(EnrollError::InvalidInput("descriptor contains non-finite values".into()));
                }
                (descriptor, None)
            }
            EnrollmentSource::Image(bytes) => {
                if !self.provider.is_ready() {
                    return Err(EnrollError::Unready);
                }
                let raster = imaging::decode_raster(&bytes)?;
                let descriptor = self
                    .provider
                    .detect_and_describe(raster)
                    .await
                    .map_err(|e| EnrollError::Provider(e.to_string()))?
                    .ok_or(EnrollError::NoFace)?;
                (descriptor, Some(self.provider.model_id()))
            }
        };

        let identity = EnrolledIdentity::new(subject_id, descriptor, model);
        self.store
            .save_identity(&identity)
            .await
            .map_err(|e| EnrollError::Store(e.to_string()))?;

        info!(
            subject = %identity.subject_id,
            length = identity.descriptor.len(),
            model = identity.model.as_deref().unwrap_or("external"),
            "Enrolled face descriptor"
        );
        Ok(identity)
    }

    pub async fn audit_history(&self, subject_id: &SubjectId) -> Result<Vec<AuditRecord>, EnrollError> {
        self.store
            .audit_records(subject_id)
            .await
            .map_err(|e| EnrollError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::storage::MockIdentityStore;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])))
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[tokio::test]
    async fn test_enroll_external_descriptor() {
        let mut store = MockIdentityStore::new();
        store
            .expect_save_identity()
            .withf(|identity| identity.model.is_none() && identity.descriptor.len() == 128)
            .times(1)
            .returning(|_| Ok(()));

        let service = EnrollmentService::new(Arc::new(MockEmbeddingProvider::new()), Arc::new(store));
        let identity = service
            .enroll(SubjectId::new("user-1"), EnrollmentSource::Descriptor(vec![0.1; 128]))
            .await
            .unwrap();

        assert_eq!(identity.subject_id.as_str(), "user-1");
    }

    #[tokio::test]
    async fn test_enroll_from_image_tags_model() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_is_ready().return_const(true);
        provider.expect_model_id().return_const("det+rec".to_string());
        provider
            .expect_detect_and_describe()
            .returning(|_| Ok(Some(Descriptor::new(vec![0.2; 128]))));

        let mut store = MockIdentityStore::new();
        store
            .expect_save_identity()
            .withf(|identity| identity.model.as_deref() == Some("det+rec"))
            .times(1)
            .returning(|_| Ok(()));

        let service = EnrollmentService::new(Arc::new(provider), Arc::new(store));
        let identity = service
            .enroll(SubjectId::new("user-1"), EnrollmentSource::Image(png()))
            .await
            .unwrap();

        assert_eq!(identity.descriptor.len(), 128);
    }

    #[tokio::test]
    async fn test_enroll_rejects_bad_input() {
        let mut store = MockIdentityStore::new();
        store.expect_save_identity().never();
        let service = EnrollmentService::new(Arc::new(MockEmbeddingProvider::new()), Arc::new(store));

        let empty = service
            .enroll(SubjectId::new("user-1"), EnrollmentSource::Descriptor(vec![]))
            .await;
        assert!(matches!(empty, Err(EnrollError::InvalidInput(_))));

        let nan = service
            .enroll(SubjectId::new("user-1"), EnrollmentSource::Descriptor(vec![f32::NAN]))
            .await;
        assert!(matches!(nan, Err(EnrollError::InvalidInput(_))));

        let blank_subject = service
            .enroll(SubjectId::new(" "), EnrollmentSource::Descriptor(vec![0.0; 128]))
            .await;
        assert!(matches!(blank_subject, Err(EnrollError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_enroll_image_without_face() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_is_ready().return_const(true);
        provider.expect_detect_and_describe().returning(|_| Ok(None));
        let mut store = MockIdentityStore::new();
        store.expect_save_identity().never();

        let service = EnrollmentService::new(Arc::new(provider), Arc::new(store));
        let result = service
            .enroll(SubjectId::new("user-1"), EnrollmentSource::Image(png()))
            .await;

        assert!(matches!(result, Err(EnrollError::NoFace)));
    }

    #[tokio::test]
    async fn test_enroll_image_before_models_load() {
        let mut provider = MockEmbeddingProvider::new();
        provider.expect_is_ready().return_const(false);

        let service = EnrollmentService::new(Arc::new(provider), Arc::new(MockIdentityStore::new()));
        let result = service
            .enroll(SubjectId::new("user-1"), EnrollmentSource::Image(png()))
            .await;

        assert!(matches!(result, Err(EnrollError::Unready)));
    }
}
