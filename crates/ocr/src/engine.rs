use slipscan_core::HealthStatus;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::recognizer::{OcrError, TextRecognizer};

type Factory = dyn Fn() -> Result<Arc<dyn TextRecognizer>, OcrError> + Send + Sync;

/// Process-wide handle to the recognition engine.
///
/// The engine is built on first use and then shared read-only by every run.
/// A failed build leaves the handle empty, so the next request retries it.
/// Callers that arrive while a build is in flight wait for that build instead
/// of starting another one.
pub struct EngineHandle {
    factory: Arc<Factory>,
    engine: OnceCell<Arc<dyn TextRecognizer>>,
}

impl EngineHandle {
    /// `factory` may block (model loading); it runs on the blocking pool.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TextRecognizer>, OcrError> + Send + Sync + 'static,
    {
        Self { factory: Arc::new(factory), engine: OnceCell::new() }
    }

    /// A handle that is loaded from the start.
    pub fn loaded<R: TextRecognizer + 'static>(recognizer: R) -> Self {
        let engine: Arc<dyn TextRecognizer> = Arc::new(recognizer);
        let for_factory = Arc::clone(&engine);
        Self {
            factory: Arc::new(move || Ok::<_, OcrError>(Arc::clone(&for_factory))),
            engine: OnceCell::new_with(Some(engine)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    /// The shared engine, building it if this is the first successful call.
    pub async fn get(&self) -> Result<Arc<dyn TextRecognizer>, OcrError> {
        self.engine
            .get_or_try_init(|| async {
                tracing::info!("Initializing OCR engine...");
                let factory = Arc::clone(&self.factory);
                let engine = tokio::task::spawn_blocking(move || factory())
                    .await
                    .map_err(|e| OcrError::Engine(format!("engine initialization aborted: {e}")))??;
                tracing::info!("OCR engine initialized");
                Ok::<_, OcrError>(engine)
            })
            .await
            .cloned()
    }

    /// Best-effort startup load. Failure is logged, never propagated.
    pub async fn warm_up(&self) -> bool {
        match self.get().await {
            Ok(_) => {
                tracing::info!("OCR engine ready");
                true
            }
            Err(e) => {
                tracing::error!("Failed to initialize OCR engine: {e}");
                false
            }
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus::now(self.is_loaded())
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle").field("loaded", &self.is_loaded()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_factory(
        builds: Arc<AtomicUsize>,
        fail_first: usize,
    ) -> impl Fn() -> Result<Arc<dyn TextRecognizer>, OcrError> + Send + Sync + 'static {
        move || {
            let n = builds.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(10));
            if n < fail_first {
                Err(OcrError::Engine("model files missing".into()))
            } else {
                Ok(Arc::new(MockRecognizer::empty()) as Arc<dyn TextRecognizer>)
            }
        }
    }

    #[tokio::test]
    async fn builds_lazily_and_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = EngineHandle::new(counting_factory(Arc::clone(&builds), 0));
        assert!(!handle.is_loaded());
        assert_eq!(builds.load(Ordering::SeqCst), 0);

        handle.get().await.unwrap();
        handle.get().await.unwrap();
        assert!(handle.is_loaded());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = Arc::new(EngineHandle::new(counting_factory(Arc::clone(&builds), 0)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                tokio::spawn(async move { handle.get().await.map(|_| ()) })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_build_is_retried_next_time() {
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = EngineHandle::new(counting_factory(Arc::clone(&builds), 1));

        assert!(!handle.warm_up().await);
        assert!(!handle.is_loaded());
        assert!(!handle.health().ocr_engine_loaded);

        handle.get().await.unwrap();
        assert!(handle.health().ocr_engine_loaded);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loaded_handle_needs_no_build() {
        let handle = EngineHandle::loaded(MockRecognizer::empty());
        assert!(handle.is_loaded());
        assert!(handle.warm_up().await);
    }
}
