use serde::{Deserialize, Serialize};
use std::fmt;

use crate::quality::QualityMetrics;

/// Machine-readable failure codes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ImageTooSmall,
    OcrProcessingFailed,
}

impl ErrorCode {
    /// HTTP-style status a transport layer should use for this code.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::ImageTooSmall => 400,
            ErrorCode::OcrProcessingFailed => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::ImageTooSmall => write!(f, "IMAGE_TOO_SMALL"),
            ErrorCode::OcrProcessingFailed => write!(f, "OCR_PROCESSING_FAILED"),
        }
    }
}

/// Structured rejection returned in place of an `OcrResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityMetrics>,
}

impl ErrorPayload {
    pub fn too_small(quality: QualityMetrics) -> Self {
        Self {
            error: ErrorCode::ImageTooSmall,
            message: too_small_message(&quality),
            quality: Some(quality),
        }
    }

    pub fn processing_failed(message: impl Into<String>) -> Self {
        Self { error: ErrorCode::OcrProcessingFailed, message: message.into(), quality: None }
    }
}

pub fn too_small_message(quality: &QualityMetrics) -> String {
    format!(
        "Image too small: {}x{}. Minimum: {min}x{min}",
        quality.width,
        quality.height,
        min = crate::quality::MIN_DIMENSION,
    )
}
