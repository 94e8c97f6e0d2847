pub mod config;
pub mod document;
pub mod error;
pub mod health;
pub mod quality;

pub use config::{Config, ConfigError, EngineBackend, EngineConfig, IntakeConfig};
pub use document::{ConfidenceSummary, OcrResult, Quad, TextBlock};
pub use error::{ErrorCode, ErrorPayload};
pub use health::HealthStatus;
pub use quality::{QualityMetrics, BLUR_THRESHOLD, LOW_CONTRAST_THRESHOLD, MIN_DIMENSION};
