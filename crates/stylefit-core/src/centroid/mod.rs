//! Persona centroids: the mean stylometric signature of a persona's samples.
//!
//! - `sources`: where each persona's reference corpus lives on disk
//! - `store`: the explicit, persistable `CentroidStore` shared read-only by scoring

pub mod sources;
pub mod store;

pub use sources::{read_samples, PersonaSources};
pub use store::{CentroidStore, LoadReport, PrepareReport};

use regex::Regex;
use std::sync::OnceLock;

use crate::error::BuildError;
use crate::features::{extract_features, StyleFeatureVector, FEATURE_DIM};

static BLANK_LINE_RE: OnceLock<Regex> = OnceLock::new();

/// Split a persona corpus into samples. Samples are separated by one or more
/// blank lines; each sample is trimmed and empty ones are dropped.
pub fn split_samples(corpus: &str) -> Vec<&str> {
    let re = BLANK_LINE_RE.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("blank line regex"));
    re.split(corpus)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Element-wise mean of feature vectors. `None` for an empty slice.
///
/// Each dimension is summed in sorted order, so the result does not depend on
/// the order of `vectors`.
pub fn mean_vector(vectors: &[StyleFeatureVector]) -> Option<StyleFeatureVector> {
    if vectors.is_empty() {
        return None;
    }
    let n = vectors.len() as f64;
    let mut out = [0.0; FEATURE_DIM];
    let mut column: Vec<f64> = Vec::with_capacity(vectors.len());
    for (dim, slot) in out.iter_mut().enumerate() {
        column.clear();
        column.extend(vectors.iter().map(|v| v.values()[dim]));
        column.sort_by(f64::total_cmp);
        *slot = column.iter().sum::<f64>() / n;
    }
    Some(StyleFeatureVector::new(out))
}

/// Build the centroid of `persona` from raw text samples.
pub fn build_centroid<S: AsRef<str>>(
    persona: &str,
    samples: &[S],
) -> Result<StyleFeatureVector, BuildError> {
    let vectors: Vec<StyleFeatureVector> = samples
        .iter()
        .map(|s| extract_features(s.as_ref()))
        .collect();
    mean_vector(&vectors).ok_or_else(|| BuildError::EmptyPersonaCorpus {
        persona: persona.to_string(),
    })
}
