use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::laplacian_filter;
use slipscan_core::QualityMetrics;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// The intensity channel of an image together with its quality metrics.
/// The normalizer consumes `gray` directly instead of converting again.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub gray: GrayImage,
    pub metrics: QualityMetrics,
}

/// Decode raw bytes (JPEG / PNG / WEBP / …) and measure them.
pub fn analyze_bytes(data: &[u8]) -> Result<Analysis, AnalyzeError> {
    let img = image::load_from_memory(data)?;
    Ok(analyze(&img))
}

/// Measure an already decoded image. Width and height come from the pixel
/// grid itself.
pub fn analyze(img: &DynamicImage) -> Analysis {
    let gray = to_intensity(img);
    let metrics = QualityMetrics::new(
        gray.width(),
        gray.height(),
        laplacian_variance(&gray),
        intensity_std_dev(&gray),
    );

    tracing::debug!(
        width = metrics.width,
        height = metrics.height,
        sharpness = metrics.sharpness,
        contrast = metrics.contrast,
        is_blurry = metrics.is_blurry,
        is_low_contrast = metrics.is_low_contrast,
        "Quality assessed"
    );

    Analysis { gray, metrics }
}

/// Single-channel intensity using BT.601 luma weights.
///
/// Weights 0.299 / 0.587 / 0.114 in 14-bit fixed point, so the conversion is
/// exact and platform independent.
pub fn to_intensity(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            img.to_luma8()
        }
        other => {
            let rgb = other.to_rgb8();
            ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                let y = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14;
                Luma([y.min(255) as u8])
            })
        }
    }
}

/// Variance of the 3×3 Laplacian response. Flat images score 0.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let response = laplacian_filter(gray);
    variance(response.pixels().map(|p| p[0] as f64))
}

/// Population standard deviation of pixel intensities.
pub fn intensity_std_dev(gray: &GrayImage) -> f64 {
    variance(gray.pixels().map(|p| p[0] as f64)).sqrt()
}

fn variance(samples: impl Iterator<Item = f64>) -> f64 {
    // Welford's running update.
    let (count, _, m2) = samples.fold((0u64, 0.0f64, 0.0f64), |(n, mean, m2), v| {
        let n = n + 1;
        let delta = v - mean;
        let mean = mean + delta / n as f64;
        (n, mean, m2 + delta * (v - mean))
    });
    if count == 0 {
        return 0.0;
    }
    (m2 / count as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn solid_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |_, _| Luma([value])))
    }

    fn checkerboard(width: u32, height: u32, cell: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        }))
    }

    #[test]
    fn flat_gray_is_blurry_and_low_contrast() {
        let a = analyze(&solid_gray(64, 48, 128));
        assert_eq!(a.metrics.width, 64);
        assert_eq!(a.metrics.height, 48);
        assert!(a.metrics.sharpness.abs() < 1e-9);
        assert!(a.metrics.contrast.abs() < 1e-9);
        assert!(a.metrics.is_blurry);
        assert!(a.metrics.is_low_contrast);
    }

    #[test]
    fn checkerboard_is_sharp_and_contrasty() {
        let a = analyze(&checkerboard(64, 64, 4));
        assert!(a.metrics.sharpness > 1000.0);
        // Half black, half white: std dev is exactly 127.5.
        assert!((a.metrics.contrast - 127.5).abs() < 1e-9);
        assert!(!a.metrics.is_blurry);
        assert!(!a.metrics.is_low_contrast);
    }

    #[test]
    fn color_input_uses_luma_weights() {
        let rgb: RgbImage = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([255u8, 0, 0])
            } else {
                Rgb([0u8, 255, 0])
            }
        });
        let gray = to_intensity(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
    }

    #[test]
    fn std_dev_of_two_levels() {
        let img: GrayImage = ImageBuffer::from_fn(2, 1, |x, _| Luma([if x == 0 { 10u8 } else { 30 }]));
        assert!((intensity_std_dev(&img) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn analyze_bytes_round_trips_png() {
        let mut png = Vec::new();
        checkerboard(32, 16, 2)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let a = analyze_bytes(&png).unwrap();
        assert_eq!((a.metrics.width, a.metrics.height), (32, 16));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = analyze_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnalyzeError::Decode(_)));
    }
}
