use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::contrast::equalize_histogram;
use slipscan_core::QualityMetrics;

use crate::analyze::Analysis;
use crate::denoise::{non_local_means, NlMeansParams};

/// Contrast (intensity std dev) below which histogram equalization is applied.
/// Deliberately looser than the low-contrast flag so correction starts earlier.
pub const EQUALIZE_BELOW_CONTRAST: f64 = 50.0;

/// A recognition-ready image plus a record of which optional steps ran.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Grayscale content replicated into three channels.
    pub image: RgbImage,
    pub equalized: bool,
}

/// Grayscale → (equalize if flat) → denoise → 3-channel.
///
/// Stateless and deterministic: identical input always yields identical output.
pub fn normalize(analysis: &Analysis) -> NormalizedImage {
    normalize_gray(&analysis.gray, &analysis.metrics)
}

pub fn normalize_gray(gray: &GrayImage, metrics: &QualityMetrics) -> NormalizedImage {
    let (denoised, equalized) = if metrics.contrast < EQUALIZE_BELOW_CONTRAST {
        (non_local_means(&equalize_histogram(gray), NlMeansParams::RECEIPT_PHOTO), true)
    } else {
        (non_local_means(gray, NlMeansParams::RECEIPT_PHOTO), false)
    };

    tracing::debug!(equalized, contrast = metrics.contrast, "Image normalized");

    NormalizedImage {
        image: DynamicImage::ImageLuma8(denoised).to_rgb8(),
        equalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyze;
    use image::{ImageBuffer, Luma};

    fn stripes(width: u32, height: u32, low: u8, high: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |x, _| {
            if (x / 3) % 2 == 0 {
                Luma([low])
            } else {
                Luma([high])
            }
        }))
    }

    #[test]
    fn high_contrast_skips_equalization() {
        let a = analyze(&stripes(32, 32, 0, 255));
        assert!(a.metrics.contrast >= EQUALIZE_BELOW_CONTRAST);
        assert!(!normalize(&a).equalized);
    }

    #[test]
    fn low_contrast_triggers_equalization() {
        let a = analyze(&stripes(32, 32, 80, 150));
        assert!(a.metrics.contrast < EQUALIZE_BELOW_CONTRAST);
        // Between the two thresholds: not flagged, but still corrected.
        assert!(!a.metrics.is_low_contrast);
        let n = normalize(&a);
        assert!(n.equalized);
    }

    fn denoised_rgb(gray: &GrayImage) -> RgbImage {
        DynamicImage::ImageLuma8(non_local_means(gray, NlMeansParams::RECEIPT_PHOTO)).to_rgb8()
    }

    #[test]
    fn high_contrast_output_is_plain_denoise() {
        let a = analyze(&stripes(32, 32, 0, 255));
        let n = normalize(&a);
        assert_eq!(n.image.as_raw(), denoised_rgb(&a.gray).as_raw());
    }

    #[test]
    fn low_contrast_output_is_equalized_then_denoised() {
        let a = analyze(&stripes(32, 32, 80, 150));
        let n = normalize(&a);
        assert_eq!(n.image.as_raw(), denoised_rgb(&equalize_histogram(&a.gray)).as_raw());
        assert_ne!(n.image.as_raw(), denoised_rgb(&a.gray).as_raw());
    }

    #[test]
    fn equalization_widens_intensity_range() {
        let a = analyze(&stripes(32, 32, 80, 150));
        let n = normalize(&a);
        let values: Vec<u8> = n.image.pixels().map(|p| p[0]).collect();
        let spread = values.iter().max().unwrap() - values.iter().min().unwrap();
        assert!(spread > 70);
    }

    #[test]
    fn output_is_three_identical_channels() {
        let n = normalize(&analyze(&stripes(24, 16, 30, 220)));
        assert_eq!(n.image.dimensions(), (24, 16));
        assert!(n.image.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn normalization_is_deterministic() {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_fn(48, 40, |x, y| {
            Luma([((x * 31 + y * 17) % 97 + 60) as u8])
        }));
        let first = normalize(&analyze(&img));
        let second = normalize(&analyze(&img));
        assert_eq!(first.image.as_raw(), second.image.as_raw());
        assert_eq!(first.equalized, second.equalized);
    }
}
