use slipscan_core::error::too_small_message;
use slipscan_core::{ErrorPayload, OcrResult, QualityMetrics};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;

use crate::analyze::{self, AnalyzeError};
use crate::confidence;
use crate::engine::EngineHandle;
use crate::mapper;
use crate::normalize::{self, NormalizedImage};
use crate::recognizer::OcrError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Decode(#[from] AnalyzeError),
    #[error("{}", too_small_message(.metrics))]
    ImageTooSmall { metrics: QualityMetrics },
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(#[source] OcrError),
    #[error("{message}")]
    ProcessingFailed { message: String },
}

impl PipelineError {
    fn processing(message: impl std::fmt::Display) -> Self {
        PipelineError::ProcessingFailed { message: message.to_string() }
    }

    /// The structured payload handed back to callers. Only undersized images
    /// get their own code; every other failure is a processing failure.
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            PipelineError::ImageTooSmall { metrics } => ErrorPayload::too_small(*metrics),
            other => ErrorPayload::processing_failed(other.to_string()),
        }
    }

    pub fn status(&self) -> u16 {
        self.to_payload().error.status()
    }
}

/// Orchestrates: analyze → admission check → normalize → recognize → map → aggregate.
///
/// Runs are independent; the only shared state is the engine handle.
pub struct ReceiptPipeline {
    engine: Arc<EngineHandle>,
}

impl ReceiptPipeline {
    pub fn new(engine: Arc<EngineHandle>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<OcrResult, PipelineError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::processing(format!("{}: {e}", path.display())))?;
        self.process_bytes(&bytes).await
    }

    /// Process raw encoded image bytes (JPEG / PNG / WEBP / …).
    pub async fn process_bytes(&self, data: &[u8]) -> Result<OcrResult, PipelineError> {
        let span = tracing::info_span!("ocr_run", run_id = %uuid::Uuid::new_v4(), bytes = data.len());
        let outcome = self.run(data).instrument(span.clone()).await;

        span.in_scope(|| match &outcome {
            Ok(result) => tracing::info!(
                "OCR completed: {} blocks, confidence: {:.2}, time: {}ms",
                result.blocks.len(),
                result.confidence.overall,
                result.processing_time_ms
            ),
            Err(PipelineError::ImageTooSmall { metrics }) => {
                tracing::warn!("Rejected undersized image: {}x{}", metrics.width, metrics.height)
            }
            Err(e) => tracing::error!("OCR processing failed: {e}"),
        });
        outcome
    }

    async fn run(&self, data: &[u8]) -> Result<OcrResult, PipelineError> {
        let started = Instant::now();

        // 1. Measure, gate and normalize off the async executor.
        let data = data.to_vec();
        let (metrics, normalized) = tokio::task::spawn_blocking(move || prepare(&data))
            .await
            .map_err(PipelineError::processing)??;

        // 2. Shared engine, built on first use.
        let engine = self.engine.get().await.map_err(PipelineError::EngineUnavailable)?;

        // 3. Recognize.
        let raw = tokio::task::spawn_blocking(move || engine.recognize(&normalized.image))
            .await
            .map_err(PipelineError::processing)?
            .map_err(PipelineError::processing)?;

        // 4. Structure and score.
        let blocks = mapper::map_detections(raw);
        let summary = confidence::summarize(&blocks);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(OcrResult::new(blocks, summary, metrics, elapsed_ms))
    }
}

/// Decode, measure and normalize. Undersized images are rejected before the
/// expensive denoising pass and never reach the engine.
fn prepare(data: &[u8]) -> Result<(QualityMetrics, NormalizedImage), PipelineError> {
    let analysis = analyze::analyze_bytes(data)?;
    if analysis.metrics.is_undersized() {
        return Err(PipelineError::ImageTooSmall { metrics: analysis.metrics });
    }
    let normalized = normalize::normalize(&analysis);
    Ok((analysis.metrics, normalized))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
