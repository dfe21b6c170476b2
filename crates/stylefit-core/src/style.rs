//! Per-item style scoring against the centroid store.

use serde::{Deserialize, Serialize};
use std::fmt;

use tracing::{debug, warn};

use crate::centroid::CentroidStore;
use crate::features::extract_features;
use crate::similarity::try_style_similarity;

/// Why an item received no style score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPersona,
    NoCentroid,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPersona => f.write_str("no_persona"),
            Self::NoCentroid => f.write_str("no_centroid"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleOutcome {
    /// `degenerate` is set when a zero-mass vector forced the score to 0.
    Scored { similarity: f64, degenerate: bool },
    Skipped(SkipReason),
}

impl StyleOutcome {
    pub fn similarity(&self) -> Option<f64> {
        match self {
            Self::Scored { similarity, .. } => Some(*similarity),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Scored { degenerate: true, .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped(r) => Some(*r),
            Self::Scored { .. } => None,
        }
    }
}

/// Score `text` against the centroid of `persona`.
///
/// A missing persona or centroid skips the item rather than defaulting the score.
pub fn score_candidate(
    store: &CentroidStore,
    persona: Option<&str>,
    text: &str,
    base: f64,
) -> StyleOutcome {
    let Some(persona) = persona.filter(|p| !p.trim().is_empty()) else {
        return StyleOutcome::Skipped(SkipReason::NoPersona);
    };
    let Some(centroid) = store.get(persona) else {
        debug!("no centroid for persona '{}'", persona);
        return StyleOutcome::Skipped(SkipReason::NoCentroid);
    };
    let candidate = extract_features(text);
    match try_style_similarity(&candidate, centroid, base) {
        Ok(similarity) => StyleOutcome::Scored {
            similarity,
            degenerate: false,
        },
        Err(e) => {
            warn!("persona '{}': {}; scoring style similarity as 0", persona, e);
            StyleOutcome::Scored {
                similarity: 0.0,
                degenerate: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::build_centroid;
    use crate::similarity::DEFAULT_DIVERGENCE_BASE;

    const FORMAL: &[&str] = &[
        "The quarterly assessment indicates that operational expenditures remained within the projected parameters established by the finance committee during the preceding fiscal year.",
        "Following careful examination of the available evidence, the review board concluded that the proposed regulatory framework requires substantial revision before implementation.",
        "The institution maintains that its governance procedures satisfy the statutory obligations imposed by the relevant oversight authorities in every jurisdiction.",
    ];
    const EXCLAMATORY: &[&str] = &[
        "This is amazing! Love it!",
        "Wow! So cool! Best day ever!",
        "Yes! We did it! Incredible!",
    ];
    const CANDIDATE: &str =
        "The committee approved the measure unanimously after extensive deliberation.";

    fn store() -> CentroidStore {
        let mut store = CentroidStore::in_memory();
        store.insert("formal", build_centroid("formal", FORMAL).unwrap());
        store.insert("exclamatory", build_centroid("exclamatory", EXCLAMATORY).unwrap());
        store
    }

    #[test]
    fn test_formal_candidate_prefers_formal_persona() {
        let store = store();
        let formal = score_candidate(&store, Some("formal"), CANDIDATE, DEFAULT_DIVERGENCE_BASE)
            .similarity()
            .unwrap();
        let excl = score_candidate(&store, Some("exclamatory"), CANDIDATE, DEFAULT_DIVERGENCE_BASE)
            .similarity()
            .unwrap();
        assert!(formal > excl, "formal {} vs exclamatory {}", formal, excl);
        assert!(formal > 0.8, "formal similarity {}", formal);
        assert!(excl < 0.2, "exclamatory similarity {}", excl);
    }

    #[test]
    fn test_missing_persona_or_centroid_is_skipped() {
        let store = store();
        assert_eq!(
            score_candidate(&store, None, CANDIDATE, 2.0),
            StyleOutcome::Skipped(SkipReason::NoPersona)
        );
        assert_eq!(
            score_candidate(&store, Some("  "), CANDIDATE, 2.0),
            StyleOutcome::Skipped(SkipReason::NoPersona)
        );
        let outcome = score_candidate(&store, Some("pirate"), CANDIDATE, 2.0);
        assert_eq!(outcome, StyleOutcome::Skipped(SkipReason::NoCentroid));
        assert!(outcome.similarity().is_none());
    }

    #[test]
    fn test_punctuation_only_candidate_is_degenerate() {
        let outcome = score_candidate(&store(), Some("formal"), "?!...", 2.0);
        assert_eq!(
            outcome,
            StyleOutcome::Scored {
                similarity: 0.0,
                degenerate: true
            }
        );
        assert!(outcome.is_degenerate());
        assert!(!outcome.is_skipped());
    }
}
