use serde::{Deserialize, Serialize, Serializer};

/// Laplacian variance below which an image is flagged as blurry.
pub const BLUR_THRESHOLD: f64 = 50.0;

/// Intensity standard deviation below which an image is flagged as low contrast.
/// Diagnostic only; the normalizer uses its own, looser trigger.
pub const LOW_CONTRAST_THRESHOLD: f64 = 30.0;

/// Smallest width and height accepted for recognition.
pub const MIN_DIMENSION: u32 = 200;

/// Objective quality measurements of one decoded image.
///
/// `sharpness` and `contrast` keep full precision in memory; they are rounded
/// to two decimals only when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub width: u32,
    pub height: u32,
    #[serde(serialize_with = "round_2dp")]
    pub sharpness: f64,
    #[serde(serialize_with = "round_2dp")]
    pub contrast: f64,
    pub is_blurry: bool,
    pub is_low_contrast: bool,
}

impl QualityMetrics {
    /// Builds metrics from raw measurements, deriving both flags.
    pub fn new(width: u32, height: u32, sharpness: f64, contrast: f64) -> Self {
        Self {
            width,
            height,
            sharpness,
            contrast,
            is_blurry: sharpness < BLUR_THRESHOLD,
            is_low_contrast: contrast < LOW_CONTRAST_THRESHOLD,
        }
    }

    /// Whether either axis falls below [`MIN_DIMENSION`].
    pub fn is_undersized(&self) -> bool {
        self.width < MIN_DIMENSION || self.height < MIN_DIMENSION
    }
}

fn round_2dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((value * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_fixed_thresholds() {
        let m = QualityMetrics::new(300, 300, 49.99, 29.99);
        assert!(m.is_blurry);
        assert!(m.is_low_contrast);

        let m = QualityMetrics::new(300, 300, 50.0, 30.0);
        assert!(!m.is_blurry);
        assert!(!m.is_low_contrast);
    }

    #[test]
    fn undersized_on_either_axis() {
        assert!(QualityMetrics::new(199, 800, 100.0, 60.0).is_undersized());
        assert!(QualityMetrics::new(800, 199, 100.0, 60.0).is_undersized());
        assert!(!QualityMetrics::new(200, 200, 100.0, 60.0).is_undersized());
    }

    #[test]
    fn serializes_rounded_measurements() {
        let m = QualityMetrics::new(640, 480, 123.456_789, 41.234_5);
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["sharpness"], 123.46);
        assert_eq!(json["contrast"], 41.23);
        assert_eq!(json["width"], 640);
        assert_eq!(json["is_blurry"], false);
    }
}
