use anyhow::Context;
use facecheck::{utils::{config::Config, logging}, Application};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new().context("failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init(&config.logging)?;

    info!("Starting facecheck v{}", env!("CARGO_PKG_VERSION"));

    let app = Application::new(config).map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    let server = app.start().map_err(|e| {
        error!("Failed to start application: {}", e);
        e
    })?;

    // actix handles SIGINT/SIGTERM and resolves once workers have drained
    if let Err(e) = server.await {
        error!("API server stopped with error: {}", e);
    }

    if let Err(e) = app.shutdown() {
        error!("Error during shutdown: {}", e);
    }

    Ok(())
}
