//! Jensen-Shannon style similarity.
//!
//! Both feature vectors are read as unnormalised distributions over their ten
//! dimensions. After clipping negatives and normalising to unit mass,
//! `similarity = 1 - JSD(P, Q)` with the divergence taken in `base` (2 by
//! default), which keeps the score in [0, 1].

use tracing::warn;

use crate::error::{DegenerateVectorError, VectorSide};
use crate::features::StyleFeatureVector;

pub const DEFAULT_DIVERGENCE_BASE: f64 = 2.0;

/// Clip to non-negative finite values and scale to unit mass.
/// `None` when nothing is left to normalise.
fn to_distribution(values: &[f64]) -> Option<Vec<f64>> {
    let clipped: Vec<f64> = values
        .iter()
        .map(|v| if v.is_finite() && *v > 0.0 { *v } else { 0.0 })
        .collect();
    let total: f64 = clipped.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    Some(clipped.into_iter().map(|v| v / total).collect())
}

/// KL(P‖M) in the given base, with the convention 0·log(0/x) = 0.
fn kl_divergence(p: &[f64], m: &[f64], base: f64) -> f64 {
    let ln_base = base.ln();
    p.iter()
        .zip(m)
        .filter(|(pi, mi)| **pi > 0.0 && **mi > 0.0)
        .map(|(pi, mi)| pi * (pi / mi).ln() / ln_base)
        .sum()
}

/// Jensen-Shannon divergence between two probability distributions of equal length.
pub fn jensen_shannon_divergence(p: &[f64], q: &[f64], base: f64) -> f64 {
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| 0.5 * (a + b)).collect();
    let jsd = 0.5 * kl_divergence(p, &m, base) + 0.5 * kl_divergence(q, &m, base);
    jsd.max(0.0)
}

/// Similarity in [0, 1] between a candidate vector and a persona centroid.
///
/// Fails only when one of the vectors has zero mass.
pub fn try_style_similarity(
    candidate: &StyleFeatureVector,
    centroid: &StyleFeatureVector,
    base: f64,
) -> Result<f64, DegenerateVectorError> {
    let p = to_distribution(candidate.as_slice()).ok_or(DegenerateVectorError {
        side: VectorSide::Candidate,
    })?;
    let q = to_distribution(centroid.as_slice()).ok_or(DegenerateVectorError {
        side: VectorSide::Centroid,
    })?;
    let jsd = jensen_shannon_divergence(&p, &q, base);
    Ok((1.0 - jsd).clamp(0.0, 1.0))
}

/// Like [`try_style_similarity`], but a degenerate vector is logged and scored 0.
pub fn style_similarity(
    candidate: &StyleFeatureVector,
    centroid: &StyleFeatureVector,
    base: f64,
) -> f64 {
    match try_style_similarity(candidate, centroid, base) {
        Ok(s) => s,
        Err(e) => {
            warn!("{}; scoring style similarity as 0", e);
            0.0
        }
    }
}
