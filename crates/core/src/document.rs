use serde::{Deserialize, Serialize};

use crate::quality::QualityMetrics;

/// Four `(x, y)` corners in image pixel space, in the order the engine emitted them.
pub type Quad = [[f64; 2]; 4];

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// Engine confidence (0.0–1.0), rounded to four decimals.
    pub confidence: f64,
    pub bbox: Quad,
}

/// Document-level confidence figures.
///
/// `vendor`, `amount` and `date` all carry the length-weighted average. They are
/// placeholders until field-specific extraction exists; `overall` is the plain
/// mean of block confidences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub vendor: f64,
    pub amount: f64,
    pub date: f64,
    pub overall: f64,
}

impl ConfidenceSummary {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// The complete, immutable outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Block texts joined by `\n`, in detection order.
    pub text: String,
    pub blocks: Vec<TextBlock>,
    pub confidence: ConfidenceSummary,
    pub quality: QualityMetrics,
    pub processing_time_ms: u64,
}

impl OcrResult {
    /// Assembles a result, deriving the full text from `blocks`.
    pub fn new(
        blocks: Vec<TextBlock>,
        confidence: ConfidenceSummary,
        quality: QualityMetrics,
        processing_time_ms: u64,
    ) -> Self {
        let text = blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { text, blocks, confidence, quality, processing_time_ms }
    }
}
