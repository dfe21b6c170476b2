//! stylefit core: the style-fidelity subsystem.
//!
//! Text goes through [`text`] tokenization, becomes a ten-dimensional
//! [`features::StyleFeatureVector`], and is compared with a persona
//! [`centroid`] by [`similarity`] (1 - Jensen-Shannon divergence).

pub mod centroid;
pub mod config;
pub mod error;
pub mod features;
pub mod similarity;
pub mod style;
pub mod text;

pub use centroid::{build_centroid, CentroidStore, PersonaSources};
pub use config::EvalConfig;
pub use error::{BuildError, CacheError, ConfigError, DegenerateVectorError, VectorSide};
pub use features::{extract_features, StyleFeatureVector, FEATURE_DIM, FEATURE_NAMES};
pub use similarity::{style_similarity, try_style_similarity, DEFAULT_DIVERGENCE_BASE};
pub use style::{score_candidate, SkipReason, StyleOutcome};
