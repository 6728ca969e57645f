use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use crate::utils::error::{Result, ServiceError};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub models: ModelConfig,
    pub verification: VerificationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of HTTP workers, 0 keeps the actix default (one per core).
    pub workers: usize,
    pub allowed_origins: Vec<String>,
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub directory: PathBuf,
    pub detector_file: String,
    pub recognizer_file: String,
    pub detector_input_width: usize,
    pub detector_input_height: usize,
    pub recognizer_input_size: usize,
    pub min_detection_confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Euclidean distance below which a live descriptor matches the enrolled one.
    pub match_threshold: f64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub encryption_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::from_file("config/default")
    }

    /// Loads `base` (extension optional), then `config/local`, then
    /// `FACECHECK__SECTION__KEY` environment overrides.
    pub fn from_file(base: &str) -> Result<Self> {
        let config = Self::defaults()?
            .add_source(File::with_name(base).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("FACECHECK").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = ConfigLib::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5001)?
            .set_default("server.workers", 0)?
            .set_default("server.allowed_origins", Vec::<String>::new())?
            .set_default("server.max_request_size", 10_485_760)?  // 10MB
            .set_default("models.directory", "face-models")?
            .set_default("models.detector_file", "version-RFB-320.onnx")?
            .set_default("models.recognizer_file", "mobilefacenet.onnx")?
            .set_default("models.detector_input_width", 320)?
            .set_default("models.detector_input_height", 240)?
            .set_default("models.recognizer_input_size", 112)?
            .set_default("models.min_detection_confidence", 0.7)?
            .set_default("verification.match_threshold", DEFAULT_MATCH_THRESHOLD)?
            .set_default("verification.timeout_ms", 10_000)?
            .set_default("storage.path", "data/identities")?
            .set_default("logging.level", "info")?;

        Ok(builder)
    }

    /// In-process configuration rooted at `data_dir`, with no file or
    /// environment sources.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 5001,
                workers: 1,
                allowed_origins: Vec::new(),
                max_request_size: 10_485_760,
            },
            models: ModelConfig {
                directory: data_dir.join("models"),
                detector_file: "version-RFB-320.onnx".into(),
                recognizer_file: "mobilefacenet.onnx".into(),
                detector_input_width: 320,
                detector_input_height: 240,
                recognizer_input_size: 112,
                min_detection_confidence: 0.7,
            },
            verification: VerificationConfig {
                match_threshold: DEFAULT_MATCH_THRESHOLD,
                timeout_ms: 10_000,
            },
            storage: StorageConfig {
                path: data_dir.join("identities"),
                encryption_key: "facecheck-test-key".into(),
            },
            logging: LoggingConfig {
                level: "debug".into(),
                directory: None,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ServiceError::Config("Invalid port number".into()));
        }
        if self.server.max_request_size == 0 {
            return Err(ServiceError::Config("max_request_size must be greater than 0".into()));
        }

        let threshold = self.verification.match_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ServiceError::Config(format!(
                "match_threshold must be a positive finite number, got {}",
                threshold
            )));
        }
        if self.verification.timeout_ms == 0 {
            return Err(ServiceError::Config("timeout_ms must be greater than 0".into()));
        }

        if self.models.detector_input_width == 0
            || self.models.detector_input_height == 0
            || self.models.recognizer_input_size == 0
        {
            return Err(ServiceError::Config("model input sizes must be greater than 0".into()));
        }
        let confidence = self.models.min_detection_confidence;
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(ServiceError::Config(
                "min_detection_confidence must be within (0, 1]".into(),
            ));
        }

        if self.storage.encryption_key.is_empty() {
            return Err(ServiceError::Config("encryption_key must be set".into()));
        }

        Ok(())
    }

    pub fn verification_timeout(&self) -> Duration {
        self.verification.timeout()
    }
}

impl VerificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ModelConfig {
    pub fn detector_path(&self) -> PathBuf {
        self.directory.join(&self.detector_file)
    }

    pub fn recognizer_path(&self) -> PathBuf {
        self.directory.join(&self.recognizer_file)
    }
}

impl From<ConfigError> for ServiceError {
    fn from(error: ConfigError) -> Self {
        ServiceError::Config(error.to_string())
    }
}
