// src/core/services/health.rs
use std::sync::Arc;

use serde::Serialize;

use crate::embedding::{EmbeddingProvider, ProviderStatus};
use crate::utils::metrics::{Metrics, MetricsSnapshot};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub models_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_error: Option<String>,
    pub match_threshold: f64,
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
}

pub struct HealthService {
    provider: Arc<dyn EmbeddingProvider>,
    metrics: Arc<Metrics>,
    match_threshold: f64,
}

impl HealthService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, metrics: Arc<Metrics>, match_threshold: f64) -> Self {
        Self {
            provider,
            metrics,
            match_threshold,
        }
    }

    pub fn report(&self) -> HealthReport {
        let (models_ready, model_error) = match self.provider.status() {
            ProviderStatus::Ready => (true, None),
            ProviderStatus::Loading => (false, None),
            ProviderStatus::Failed(reason) => (false, Some(reason)),
        };

        HealthReport {
            status: if models_ready { "ok" } else { "degraded" },
            models_ready,
            model_error,
            match_threshold: self.match_threshold,
            metrics: self.metrics.snapshot(),
        }
    }
}
