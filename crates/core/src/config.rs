use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    /// Returns no detections. Useful for exercising quality checks only.
    #[default]
    Mock,
    Tesseract,
}

impl std::str::FromStr for EngineBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(EngineBackend::Mock),
            "tesseract" => Ok(EngineBackend::Tesseract),
            other => Err(format!("Unknown engine backend: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: EngineBackend,
    pub language: String,
    /// Tessdata directory; `None` lets the engine use its built-in search path.
    pub data_path: Option<String>,
    /// Hold a lock around each recognition call for engines that are not thread-safe.
    pub serialize_calls: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: EngineBackend::Mock,
            language: "eng".to_string(),
            data_path: None,
            serialize_calls: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub watch_dir: Option<PathBuf>,
    /// Where JSON results are written. Defaults to the watch directory.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Pre-load the engine at startup.
    pub warm_up: bool,
    pub engine: EngineConfig,
    pub intake: IntakeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            warm_up: true,
            engine: EngineConfig::default(),
            intake: IntakeConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}
