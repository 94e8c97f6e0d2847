use image::{GrayImage, ImageBuffer, Luma};

/// Weights below this are treated as zero, which bounds the lookup table.
const MIN_WEIGHT: f64 = 0.001;

/// Parameters of the non-local-means filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NlMeansParams {
    /// Filter strength `h`. Larger values remove more noise and more detail.
    pub strength: f32,
    /// Side of the square patch compared between pixels. Odd.
    pub template_window: u32,
    /// Side of the square area searched for similar patches. Odd.
    pub search_window: u32,
}

impl NlMeansParams {
    /// Tuned for phone-camera receipt photos.
    pub const RECEIPT_PHOTO: NlMeansParams =
        NlMeansParams { strength: 10.0, template_window: 7, search_window: 21 };
}

impl Default for NlMeansParams {
    fn default() -> Self {
        Self::RECEIPT_PHOTO
    }
}

/// Output rows denoised per pass. Working memory scales with this, not the image height.
const BAND_ROWS: usize = 64;

/// Non-local-means denoising of a grayscale image.
///
/// Every output pixel is a weighted average of the pixels in its search window,
/// weighted by `exp(-d / h²)` where `d` is the mean squared difference between
/// the two surrounding template patches. Borders are extended by replication.
///
/// Patch distances are computed per search offset from an integral image of
/// squared differences, so the cost is independent of the template size.
/// Rows are processed in bands of `BAND_ROWS`; beyond the padded copy of the
/// input, scratch memory is about `24 * width * BAND_ROWS` bytes.
pub fn non_local_means(gray: &GrayImage, params: NlMeansParams) -> GrayImage {
    denoise_in_bands(gray, params, BAND_ROWS)
}

fn denoise_in_bands(gray: &GrayImage, params: NlMeansParams, band_rows: usize) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let tr = (params.template_window / 2) as usize;
    let sr = (params.search_window / 2) as usize;
    let pad = tr + sr;
    let (w, h) = (w as usize, h as usize);
    let pw = w + 2 * pad;
    let ph = h + 2 * pad;

    let padded: Vec<u8> = (0..ph)
        .flat_map(|py| {
            let sy = py.saturating_sub(pad).min(h - 1) as u32;
            (0..pw).map(move |px| {
                let sx = px.saturating_sub(pad).min(w - 1) as u32;
                gray.get_pixel(sx, sy)[0]
            })
        })
        .collect();

    let lut = weight_table(params.strength);
    let span = 2 * tr + 1;
    let area = (span * span) as u64;
    let band_rows = band_rows.clamp(1, h);

    // Region covering every template around one band, anchored at (sr, sr + y0).
    // Row 0 and column 0 of the integral stay zero.
    let rw = w + 2 * tr;
    let stride = rw + 1;
    let mut integral = vec![0u64; stride * (band_rows + 2 * tr + 1)];
    let mut weight_sum = vec![0f64; w * band_rows];
    let mut value_sum = vec![0f64; w * band_rows];
    let mut out = vec![0u8; w * h];

    for y0 in (0..h).step_by(band_rows) {
        let bh = band_rows.min(h - y0);
        let rh = bh + 2 * tr;
        weight_sum.fill(0.0);
        value_sum.fill(0.0);

        for dy in 0..=2 * sr {
            for dx in 0..=2 * sr {
                for ry in 0..rh {
                    let row = (sr + y0 + ry) * pw + sr;
                    let shifted = (y0 + ry + dy) * pw + dx;
                    let mut running = 0u64;
                    for rx in 0..rw {
                        let diff = padded[row + rx] as i32 - padded[shifted + rx] as i32;
                        running += (diff * diff) as u64;
                        integral[(ry + 1) * stride + rx + 1] = integral[ry * stride + rx + 1] + running;
                    }
                }

                for y in 0..bh {
                    for x in 0..w {
                        let sum = integral[(y + span) * stride + x + span] + integral[y * stride + x]
                            - integral[y * stride + x + span]
                            - integral[(y + span) * stride + x];
                        let dist = (sum / area) as usize;
                        let Some(&weight) = lut.get(dist) else {
                            continue;
                        };
                        let neighbor = padded[(pad + y0 + y + dy - sr) * pw + pad + x + dx - sr];
                        let idx = y * w + x;
                        weight_sum[idx] += weight;
                        value_sum[idx] += weight * neighbor as f64;
                    }
                }
            }
        }

        for idx in 0..bh * w {
            // The zero offset always contributes weight 1, so the sum is never 0.
            let v = (value_sum[idx] / weight_sum[idx]).round();
            out[y0 * w + idx] = v.clamp(0.0, 255.0) as u8;
        }
    }

    ImageBuffer::from_fn(w as u32, h as u32, |x, y| Luma([out[y as usize * w + x as usize]]))
}

/// `exp(-d / h²)` for every integer mean distance `d` whose weight is not negligible.
fn weight_table(strength: f32) -> Vec<f64> {
    let h2 = (strength as f64 * strength as f64).max(f64::EPSILON);
    let max_dist = ((-MIN_WEIGHT.ln()) * h2).ceil() as usize;
    (0..=max_dist.min(255 * 255)).map(|d| (-(d as f64) / h2).exp()).collect()
}
