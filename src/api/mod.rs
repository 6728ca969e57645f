// src/api/mod.rs
pub mod handlers;
pub mod types;

use std::sync::Arc;

use actix_web::web;

use crate::core::services::{
    enrollment::EnrollmentService, health::HealthService, verification::VerificationService,
};
use crate::utils::metrics::Metrics;

/// Shared handles wired into every actix worker.
#[derive(Clone)]
pub struct ApiState {
    pub verification: Arc<VerificationService>,
    pub enrollment: Arc<EnrollmentService>,
    pub health: Arc<HealthService>,
    pub metrics: Arc<Metrics>,
    pub max_request_size: usize,
}

impl ApiState {
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(self.verification.clone()))
            .app_data(web::Data::from(self.enrollment.clone()))
            .app_data(web::Data::from(self.health.clone()))
            .app_data(web::Data::from(self.metrics.clone()))
            .service(handlers::identity::scope(self.max_request_size))
            .service(handlers::health::resource());
        handlers::check::configure(cfg, self.max_request_size);
    }
}
