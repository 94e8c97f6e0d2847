pub mod analyze;
pub mod confidence;
pub mod denoise;
pub mod engine;
pub mod mapper;
pub mod normalize;
pub mod pipeline;
pub mod recognizer;

pub use analyze::{analyze, analyze_bytes, Analysis, AnalyzeError};
pub use confidence::summarize;
pub use denoise::{non_local_means, NlMeansParams};
pub use engine::EngineHandle;
pub use mapper::map_detections;
pub use normalize::{normalize, NormalizedImage, EQUALIZE_BELOW_CONTRAST};
pub use pipeline::{PipelineError, ReceiptPipeline};
pub use recognizer::{lines_from_tsv, MockRecognizer, OcrError, RawDetection, Serialized, TextRecognizer};
