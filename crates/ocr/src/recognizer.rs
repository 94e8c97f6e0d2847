use image::RgbImage;
use slipscan_core::Quad;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image encode error: {0}")]
    ImageEncode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
    #[error("OCR engine lock poisoned by an earlier panic")]
    Poisoned,
}

/// One line as reported by an engine, before any normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub quad: Quad,
    pub text: String,
    pub confidence: f64,
}

impl RawDetection {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f64) -> Self {
        Self { quad, text: text.into(), confidence }
    }
}

/// Abstraction over a text detection + recognition engine.
///
/// Implementations return detected lines in reading order, or `None` when the
/// engine found nothing at all. Both `None` and an empty vector mean "no text".
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> Result<Option<Vec<RawDetection>>, OcrError>;
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for std::sync::Arc<R> {
    fn recognize(&self, image: &RgbImage) -> Result<Option<Vec<RawDetection>>, OcrError> {
        (**self).recognize(image)
    }
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for Box<R> {
    fn recognize(&self, image: &RgbImage) -> Result<Option<Vec<RawDetection>>, OcrError> {
        (**self).recognize(image)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a preset list of detections regardless of the image.
pub struct MockRecognizer {
    pub detections: Option<Vec<RawDetection>>,
}

impl MockRecognizer {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections: Some(detections) }
    }

    /// An engine that never finds any text.
    pub fn empty() -> Self {
        Self { detections: None }
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, _image: &RgbImage) -> Result<Option<Vec<RawDetection>>, OcrError> {
        Ok(self.detections.clone())
    }
}

// ── Serialized access ─────────────────────────────────────────────────────────

/// Funnels every call through one lock, for engines that cannot run
/// concurrently. Only the recognition call itself is held under the lock.
pub struct Serialized<R> {
    inner: R,
    gate: Mutex<()>,
}

impl<R: TextRecognizer> Serialized<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, gate: Mutex::new(()) }
    }
}

impl<R: TextRecognizer> TextRecognizer for Serialized<R> {
    fn recognize(&self, image: &RgbImage) -> Result<Option<Vec<RawDetection>>, OcrError> {
        let _guard = self.gate.lock().map_err(|_| OcrError::Poisoned)?;
        self.inner.recognize(image)
    }
}

// ── Tesseract TSV parsing ─────────────────────────────────────────────────────

const TSV_LEVEL_WORD: u32 = 5;

/// Groups the words of a Tesseract TSV dump into line detections.
///
/// Each line gets the axis-aligned box of its words (clockwise from top-left),
/// the words joined by single spaces, and the mean word confidence scaled to
/// 0.0–1.0. Lines without any recognized word are dropped.
pub fn lines_from_tsv(tsv: &str) -> Vec<RawDetection> {
    struct Line {
        key: (u32, u32, u32, u32),
        words: Vec<String>,
        conf_sum: f64,
        conf_count: u32,
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    }

    let mut lines: Vec<Line> = Vec::new();

    for row in tsv.lines() {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let nums: Option<Vec<f64>> = cols[..11].iter().map(|c| c.trim().parse::<f64>().ok()).collect();
        // Header row and malformed rows fail to parse.
        let Some(nums) = nums else { continue };
        if nums[0] as u32 != TSV_LEVEL_WORD {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }

        let key = (nums[1] as u32, nums[2] as u32, nums[3] as u32, nums[4] as u32);
        let (left, top, width, height, conf) = (nums[6], nums[7], nums[8], nums[9], nums[10]);

        if lines.last().map(|l| l.key) != Some(key) {
            lines.push(Line {
                key,
                words: Vec::new(),
                conf_sum: 0.0,
                conf_count: 0,
                left,
                top,
                right: left + width,
                bottom: top + height,
            });
        }
        let Some(line) = lines.last_mut() else { continue };
        line.words.push(text.to_string());
        if conf >= 0.0 {
            line.conf_sum += conf;
            line.conf_count += 1;
        }
        line.left = line.left.min(left);
        line.top = line.top.min(top);
        line.right = line.right.max(left + width);
        line.bottom = line.bottom.max(top + height);
    }

    lines
        .into_iter()
        .map(|l| {
            let confidence = if l.conf_count > 0 {
                (l.conf_sum / l.conf_count as f64 / 100.0).clamp(0.0, 1.0)
            } else {
                0.0
            };
            RawDetection::new(
                [[l.left, l.top], [l.right, l.top], [l.right, l.bottom], [l.left, l.bottom]],
                l.words.join(" "),
                confidence,
            )
        })
        .collect()
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{lines_from_tsv, OcrError, RawDetection, TextRecognizer};
    use image::{DynamicImage, RgbImage};
    use leptess::LepTess;
    use std::io::Cursor;

    /// Opens a fresh Tesseract handle per call.
    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        /// Fails early when the language data cannot be loaded.
        pub fn new(data_path: Option<String>, lang: &str) -> Result<Self, OcrError> {
            LepTess::new(data_path.as_deref(), lang).map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(Self { data_path, lang: lang.to_string() })
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&self, img: &RgbImage) -> Result<Option<Vec<RawDetection>>, OcrError> {
            let mut png = Vec::new();
            DynamicImage::ImageRgb8(img.clone())
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| OcrError::ImageEncode(e.to_string()))?;

            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::ImageEncode(e.to_string()))?;
            let tsv = lt.get_tsv_text(0).map_err(|e| OcrError::Engine(e.to_string()))?;

            let lines = lines_from_tsv(&tsv);
            Ok(if lines.is_empty() { None } else { Some(lines) })
        }
    }
}
