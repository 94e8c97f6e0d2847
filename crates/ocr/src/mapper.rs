use slipscan_core::TextBlock;

use crate::confidence::round_4dp;
use crate::recognizer::RawDetection;

/// Converts raw engine output into text blocks, preserving detection order
/// and the engine's corner order.
///
/// An absent or empty result is a legitimate "no text" outcome and maps to an
/// empty list.
pub fn map_detections(raw: Option<Vec<RawDetection>>) -> Vec<TextBlock> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|d| TextBlock {
            text: d.text,
            confidence: round_4dp(sanitize(d.confidence)),
            bbox: d.quad,
        })
        .collect()
}

/// Clamps into 0.0–1.0; NaN and infinities count as no confidence at all.
fn sanitize(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILTED: [[f64; 2]; 4] = [[12.5, 40.0], [180.25, 31.0], [183.0, 58.75], [15.0, 67.5]];

    #[test]
    fn absent_result_maps_to_empty() {
        assert!(map_detections(None).is_empty());
        assert!(map_detections(Some(vec![])).is_empty());
    }

    #[test]
    fn confidence_rounded_geometry_untouched() {
        let blocks = map_detections(Some(vec![RawDetection::new(TILTED, "SUBTOTAL", 0.912_345_6)]));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "SUBTOTAL");
        assert_eq!(blocks[0].confidence, 0.9123);
        assert_eq!(blocks[0].bbox, TILTED);
    }

    #[test]
    fn order_is_preserved() {
        let lower = [[0.0, 100.0], [50.0, 100.0], [50.0, 120.0], [0.0, 120.0]];
        let upper = [[0.0, 10.0], [50.0, 10.0], [50.0, 30.0], [0.0, 30.0]];
        // Engine order wins even when it is not top-to-bottom.
        let blocks = map_detections(Some(vec![
            RawDetection::new(lower, "second", 0.8),
            RawDetection::new(upper, "first", 0.9),
        ]));
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, ["second", "first"]);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let blocks = map_detections(Some(vec![
            RawDetection::new(TILTED, "a", 1.2),
            RawDetection::new(TILTED, "b", -0.3),
        ]));
        assert_eq!(blocks[0].confidence, 1.0);
        assert_eq!(blocks[1].confidence, 0.0);
    }

    #[test]
    fn non_finite_confidence_becomes_zero() {
        let blocks = map_detections(Some(vec![
            RawDetection::new(TILTED, "TOTAL", f64::NAN),
            RawDetection::new(TILTED, "TAX", f64::INFINITY),
            RawDetection::new(TILTED, "TIP", f64::NEG_INFINITY),
        ]));
        assert!(blocks.iter().all(|b| b.confidence == 0.0));

        let summary = crate::confidence::summarize(&blocks);
        for v in [summary.overall, summary.vendor, summary.amount, summary.date] {
            assert!(v.is_finite() && (0.0..=1.0).contains(&v));
        }
    }
}
