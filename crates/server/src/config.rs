use common::{Environment, LogLevel};
use detector::DetectorConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub images_dir: String,
    pub log_level: LogLevel,
    pub environment: Environment,
    pub detector: DetectorConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let images_dir = env::var("IMAGES_DIR").unwrap_or_else(|_| "images".to_string());

        Self {
            listen_addr,
            images_dir,
            log_level: LogLevel::from_env(),
            environment: Environment::from_env(),
            detector: DetectorConfig::from_env(),
        }
    }
}
