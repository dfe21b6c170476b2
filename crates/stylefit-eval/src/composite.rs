//! Weighted composites: content quality from its sub-scores, overall quality
//! from content and style.

use stylefit_core::config::{ContentWeights, FallbackWeights, OverallWeights};

/// Weighted mean over the present `(value, weight)` pairs, renormalised by the
/// present weights. `None` when nothing is present or all weights are zero.
fn renormalised(parts: &[(Option<f64>, f64)]) -> Option<f64> {
    let (sum, weight) = parts
        .iter()
        .filter_map(|(v, w)| v.map(|v| (v * w, *w)))
        .fold((0.0, 0.0), |(s, tw), (vw, w)| (s + vw, tw + w));
    if weight > 0.0 {
        Some(sum / weight)
    } else {
        None
    }
}

/// Composite content quality.
///
/// - all three present: primary weights
/// - learned quality absent: fallback weights over overlap and embedding
/// - any other partial set: primary weights renormalised over what is present
/// - nothing present: `None`
pub fn content_quality(
    overlap: Option<f64>,
    embedding: Option<f64>,
    learned: Option<f64>,
    primary: &ContentWeights,
    fallback: &FallbackWeights,
) -> Option<f64> {
    match (overlap, embedding, learned) {
        (Some(o), Some(e), Some(l)) => Some(
            primary.overlap * o + primary.embedding_similarity * e + primary.learned_quality * l,
        ),
        (Some(o), Some(e), None) => {
            Some(fallback.overlap * o + fallback.embedding_similarity * e)
        }
        _ => renormalised(&[
            (overlap, primary.overlap),
            (embedding, primary.embedding_similarity),
            (learned, primary.learned_quality),
        ]),
    }
}

/// Overall quality. With one side missing the present side stands alone.
pub fn overall_quality(
    content: Option<f64>,
    style: Option<f64>,
    weights: &OverallWeights,
) -> Option<f64> {
    match (content, style) {
        (Some(c), Some(s)) => Some(weights.content * c + weights.style * s),
        _ => renormalised(&[(content, weights.content), (style, weights.style)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> (ContentWeights, FallbackWeights, OverallWeights) {
        (
            ContentWeights::default(),
            FallbackWeights::default(),
            OverallWeights::default(),
        )
    }

    #[test]
    fn test_all_sub_scores_use_primary_weights() {
        let (p, f, _) = defaults();
        let c = content_quality(Some(0.5), Some(0.8), Some(0.6), &p, &f).unwrap();
        assert!((c - (0.4 * 0.5 + 0.3 * 0.8 + 0.3 * 0.6)).abs() < 1e-12);
    }

    #[test]
    fn test_learned_absent_uses_fallback_and_overall() {
        let (p, f, o) = defaults();
        let content = content_quality(Some(0.8), Some(0.9), None, &p, &f).unwrap();
        assert!((content - 0.86).abs() < 1e-12);
        let overall = overall_quality(Some(content), Some(0.7), &o).unwrap();
        assert!((overall - 0.812).abs() < 1e-9, "overall {}", overall);
    }

    #[test]
    fn test_other_partial_sets_renormalise() {
        let (p, f, _) = defaults();
        let only_overlap = content_quality(Some(0.5), None, None, &p, &f).unwrap();
        assert!((only_overlap - 0.5).abs() < 1e-12);
        let overlap_learned = content_quality(Some(1.0), None, Some(0.0), &p, &f).unwrap();
        assert!((overlap_learned - 0.4 / 0.7).abs() < 1e-12);
        assert_eq!(content_quality(None, None, None, &p, &f), None);
    }

    #[test]
    fn test_overall_with_missing_side() {
        let (_, _, o) = defaults();
        assert!((overall_quality(Some(0.6), None, &o).unwrap() - 0.6).abs() < 1e-12);
        assert!((overall_quality(None, Some(0.3), &o).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(overall_quality(None, None, &o), None);
    }

    #[test]
    fn test_zero_weight_side_alone_is_none() {
        let o = OverallWeights {
            content: 1.0,
            style: 0.0,
        };
        assert_eq!(overall_quality(None, Some(0.9), &o), None);
    }
}
