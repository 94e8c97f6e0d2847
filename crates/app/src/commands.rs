use slipscan_core::{EngineBackend, EngineConfig, OcrResult};
use slipscan_ocr::{MockRecognizer, OcrError, PipelineError, ReceiptPipeline, Serialized, TextRecognizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

/// Builds the engine described by `config`. Called lazily by the engine handle.
pub fn build_engine(config: &EngineConfig) -> Result<Arc<dyn TextRecognizer>, OcrError> {
    match config.backend {
        EngineBackend::Mock => Ok(wrap(MockRecognizer::empty(), config.serialize_calls)),
        EngineBackend::Tesseract => build_tesseract(config),
    }
}

#[cfg(feature = "tesseract")]
fn build_tesseract(config: &EngineConfig) -> Result<Arc<dyn TextRecognizer>, OcrError> {
    use slipscan_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    let engine = TesseractRecognizer::new(config.data_path.clone(), &config.language)?;
    Ok(wrap(engine, config.serialize_calls))
}

#[cfg(not(feature = "tesseract"))]
fn build_tesseract(_config: &EngineConfig) -> Result<Arc<dyn TextRecognizer>, OcrError> {
    Err(OcrError::NotAvailable)
}

fn wrap<R: TextRecognizer + 'static>(engine: R, serialize: bool) -> Arc<dyn TextRecognizer> {
    if serialize {
        Arc::new(Serialized::new(engine))
    } else {
        Arc::new(engine)
    }
}

/// JSON body for a run: the result itself, or the structured error payload.
pub fn outcome_json(outcome: &Result<OcrResult, PipelineError>) -> serde_json::Value {
    let value = match outcome {
        Ok(result) => serde_json::to_value(result),
        Err(e) => serde_json::to_value(e.to_payload()),
    };
    value.unwrap_or_else(|e| serde_json::json!({ "error": "OCR_PROCESSING_FAILED", "message": e.to_string() }))
}

/// Run each file through the pipeline and print one JSON document per file.
/// Returns how many files failed.
pub async fn scan(pipeline: &ReceiptPipeline, files: &[PathBuf]) -> usize {
    let mut failures = 0;
    for path in files {
        let outcome = pipeline.process_file(path).await;
        if outcome.is_err() {
            failures += 1;
        }
        let body = serde_json::json!({
            "file": path.display().to_string(),
            "outcome": outcome_json(&outcome),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    }
    failures
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `<output_dir>/<file stem>.json`
pub fn result_path(output_dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("receipt");
    output_dir.join(format!("{stem}.json"))
}

/// Process one intake file and write its JSON next to the other results.
pub async fn process_intake_file(
    pipeline: &ReceiptPipeline,
    path: &Path,
    output_dir: &Path,
) -> std::io::Result<PathBuf> {
    let outcome = pipeline.process_file(path).await;
    let dest = result_path(output_dir, path);
    let body = serde_json::to_vec_pretty(&outcome_json(&outcome))?;
    tokio::fs::create_dir_all(output_dir).await?;
    tokio::fs::write(&dest, body).await?;
    Ok(dest)
}

// ── Watch-folder integration ──────────────────────────────────────────────────

/// Spawn a notify watcher on `watch_dir` that sends new image paths to `tx`.
/// Returns the watcher — it must be kept alive for watching to continue.
pub fn spawn_intake_watcher(
    watch_dir: &Path,
    tx: mpsc::Sender<PathBuf>,
) -> notify::Result<impl notify::Watcher> {
    use notify::{EventKind, RecursiveMode, Watcher};

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if let Ok(ev) = event {
            if matches!(ev.kind, EventKind::Create(_)) {
                for path in ev.paths.into_iter().filter(|p| is_image(p)) {
                    forward_intake_path(&tx, path);
                }
            }
        }
    })?;

    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Hand a new file to the processor without blocking the watcher thread.
/// Returns `false` when the path was dropped.
fn forward_intake_path(tx: &mpsc::Sender<PathBuf>, path: PathBuf) -> bool {
    match tx.try_send(path) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(path)) => {
            tracing::warn!("Intake queue full, skipping {}", path.display());
            false
        }
        Err(mpsc::error::TrySendError::Closed(path)) => {
            tracing::warn!("Intake processor stopped, skipping {}", path.display());
            false
        }
    }
}

/// Drain the intake channel until every sender is gone.
pub async fn run_intake(
    pipeline: &ReceiptPipeline,
    mut rx: mpsc::Receiver<PathBuf>,
    output_dir: &Path,
) {
    while let Some(path) = rx.recv().await {
        tracing::info!("Processing receipt: {}", path.display());
        match process_intake_file(pipeline, &path, output_dir).await {
            Ok(dest) => tracing::info!("Result written: {}", dest.display()),
            Err(e) => tracing::warn!("Failed to write result for {}: {e}", path.display()),
        }
    }
}
