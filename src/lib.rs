pub mod api;
pub mod core;
pub mod embedding;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{dev::Server, middleware::Logger, App, HttpServer};
use tracing::info;

use crate::{
    api::ApiState,
    core::services::{
        enrollment::EnrollmentService, health::HealthService, verification::VerificationService,
    },
    embedding::{EmbeddingProvider, OnnxFaceEmbedder},
    storage::{EncryptedStore, IdentityStore},
    utils::{
        config::{Config, ServerConfig},
        error::{Result, ServiceError},
        metrics::Metrics,
    },
};

pub struct Application {
    config: Arc<Config>,
    embedder: Arc<OnnxFaceEmbedder>,
    storage: Arc<EncryptedStore>,
    state: ApiState,
}

impl Application {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        info!("Initializing storage...");
        let storage = Arc::new(EncryptedStore::open(&config.storage)?);

        info!("Initializing services...");
        let embedder = Arc::new(OnnxFaceEmbedder::new(&config.models));
        let provider: Arc<dyn EmbeddingProvider> = embedder.clone();
        let store: Arc<dyn IdentityStore> = storage.clone();
        let metrics = Arc::new(Metrics::new());

        let state = ApiState {
            verification: Arc::new(VerificationService::new(
                provider.clone(),
                store.clone(),
                &config.verification,
            )),
            enrollment: Arc::new(EnrollmentService::new(provider.clone(), store)),
            health: Arc::new(HealthService::new(
                provider,
                metrics.clone(),
                config.verification.match_threshold,
            )),
            metrics,
            max_request_size: config.server.max_request_size,
        };

        Ok(Self {
            config,
            embedder,
            storage,
            state,
        })
    }

    /// Starts model loading in the background and binds the HTTP server.
    /// Checks arriving before the models are ready answer `models not loaded`.
    pub fn start(&self) -> Result<Server> {
        info!("Loading face models in the background...");
        let embedder = self.embedder.clone();
        tokio::spawn(async move {
            embedder.load().await;
        });

        info!(
            "Starting API server on {}:{} (match threshold {})",
            self.config.server.host, self.config.server.port, self.config.verification.match_threshold
        );
        self.start_api_server()
    }

    fn start_api_server(&self) -> Result<Server> {
        let state = self.state.clone();
        let server_config = self.config.server.clone();

        let mut server = HttpServer::new(move || {
            let state = state.clone();
            App::new()
                .wrap(Logger::default())
                .wrap(cors(&server_config))
                .configure(move |cfg| state.configure(cfg))
        });
        if self.config.server.workers > 0 {
            server = server.workers(self.config.server.workers);
        }

        let server = server
            .bind((self.config.server.host.as_str(), self.config.server.port))
            .map_err(|e| ServiceError::Server(format!("Failed to bind API server: {}", e)))?
            .run();

        Ok(server)
    }

    pub fn shutdown(&self) -> Result<()> {
        info!("Flushing storage...");
        self.storage.flush()?;

        info!("Application shutdown complete");
        Ok(())
    }
}

fn cors(config: &ServerConfig) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT"])
        .allow_any_header()
        .max_age(3600);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }
    config
        .allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
