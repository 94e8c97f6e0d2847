use slipscan_core::{ConfidenceSummary, TextBlock};

pub(crate) fn round_4dp(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Aggregates block confidences into document-level figures.
///
/// `overall` is the plain mean, rounded to four decimals. The length-weighted
/// mean `Σ(cᵢ·lenᵢ) / Σ lenᵢ` (lengths in characters) goes into `vendor`,
/// `amount` and `date` alike; weighting by length damps short, often spurious
/// fragments. When every block is empty the weighted figure is left as the
/// unnormalized accumulator, which is then 0.
pub fn summarize(blocks: &[TextBlock]) -> ConfidenceSummary {
    if blocks.is_empty() {
        return ConfidenceSummary::zero();
    }

    let mean = blocks.iter().map(|b| b.confidence).sum::<f64>() / blocks.len() as f64;

    let (mut weighted, total_len) = blocks.iter().fold((0.0f64, 0usize), |(acc, len), b| {
        let n = b.text.chars().count();
        (acc + b.confidence * n as f64, len + n)
    });
    if total_len > 0 {
        weighted /= total_len as f64;
    }

    ConfidenceSummary {
        vendor: weighted,
        amount: weighted,
        date: weighted,
        overall: round_4dp(mean),
    }
}
