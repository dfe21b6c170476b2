//! Configuration structs grouped by concern.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::env_keys::{observability as obv_keys, paths as path_keys, runtime as runtime_keys};
use super::loader::{env_bool, env_or};
use crate::error::ConfigError;
use crate::similarity::DEFAULT_DIVERGENCE_BASE;

/// Allowed deviation of a weight group's sum from 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Content composite weights when all three sub-scores are present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentWeights {
    pub overlap: f64,
    pub embedding_similarity: f64,
    pub learned_quality: f64,
}

impl Default for ContentWeights {
    fn default() -> Self {
        Self {
            overlap: 0.4,
            embedding_similarity: 0.3,
            learned_quality: 0.3,
        }
    }
}

/// Content composite weights when only the learned-quality score is missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackWeights {
    pub overlap: f64,
    pub embedding_similarity: f64,
}

impl Default for FallbackWeights {
    fn default() -> Self {
        Self {
            overlap: 0.4,
            embedding_similarity: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverallWeights {
    pub content: f64,
    pub style: f64,
}

impl Default for OverallWeights {
    fn default() -> Self {
        Self {
            content: 0.7,
            style: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Record file or directory.
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub centroid_cache: PathBuf,
    /// Optional `write_id,persona_id` CSV.
    pub persona_assignments: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("outputs"),
            centroid_cache: PathBuf::from("outputs").join("persona_centroids.json"),
            persona_assignments: None,
        }
    }
}

/// Where each item field lives in an input record, as dotted paths
/// (`metadata.author` reads `record["metadata"]["author"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldMap {
    pub source_text: String,
    pub reference: String,
    pub candidate: String,
    pub persona: String,
    pub item_id: String,
    /// Tried in order when `item_id` is absent.
    pub item_id_fallbacks: Vec<String>,
    pub embedding_similarity: String,
    pub learned_quality: String,
    /// Copied into the row's metadata under the last path segment.
    pub passthrough: Vec<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            source_text: "document_content".to_string(),
            reference: "expected_summary".to_string(),
            candidate: "generated_summary".to_string(),
            persona: "persona".to_string(),
            item_id: "write_id".to_string(),
            item_id_fallbacks: vec!["uid".to_string()],
            embedding_similarity: "bertscore_f1".to_string(),
            learned_quality: "bleurt".to_string(),
            passthrough: [
                "document_title",
                "link",
                "metadata.author",
                "metadata.sector",
                "metadata.date",
                "model_used",
                "prompt_type",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// The full evaluation config. Every field has a default, so an empty or
/// partial YAML file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    pub content_weights: ContentWeights,
    pub content_fallback_weights: FallbackWeights,
    pub overall_weights: OverallWeights,
    pub divergence_base: f64,
    /// Explicit persona id → corpus file.
    pub personas: BTreeMap<String, PathBuf>,
    /// Every `*.txt` here is a persona corpus named by its file stem.
    pub persona_dir: Option<PathBuf>,
    pub paths: PathsConfig,
    pub fields: FieldMap,
    /// Metadata keys to aggregate by, in addition to persona.
    pub group_by: Vec<String>,
    /// Learned-quality scores arrive in [-1, 1] and are mapped to [0, 1].
    pub learned_quality_raw_range: bool,
    /// Scoring threads; 0 lets rayon decide.
    pub workers: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            content_weights: ContentWeights::default(),
            content_fallback_weights: FallbackWeights::default(),
            overall_weights: OverallWeights::default(),
            divergence_base: DEFAULT_DIVERGENCE_BASE,
            personas: BTreeMap::new(),
            persona_dir: Some(PathBuf::from("data").join("personas")),
            paths: PathsConfig::default(),
            fields: FieldMap::default(),
            group_by: vec!["sector".to_string(), "model_used".to_string()],
            learned_quality_raw_range: true,
            workers: 0,
        }
    }
}

fn check_group(group: &'static str, weights: &[(&'static str, f64)]) -> Result<(), ConfigError> {
    for &(name, value) in weights {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::WeightOutOfRange { group, name, value });
        }
    }
    let sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ConfigError::WeightSum {
            group,
            sum,
            tolerance: WEIGHT_TOLERANCE,
        });
    }
    Ok(())
}

impl EvalConfig {
    /// Reject weights outside [0, 1], weight groups that do not sum to 1 and a
    /// divergence base below 2.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.content_weights;
        check_group(
            "content_weights",
            &[
                ("overlap", c.overlap),
                ("embedding_similarity", c.embedding_similarity),
                ("learned_quality", c.learned_quality),
            ],
        )?;
        let f = &self.content_fallback_weights;
        check_group(
            "content_fallback_weights",
            &[
                ("overlap", f.overlap),
                ("embedding_similarity", f.embedding_similarity),
            ],
        )?;
        let o = &self.overall_weights;
        check_group(
            "overall_weights",
            &[("content", o.content), ("style", o.style)],
        )?;
        if !self.divergence_base.is_finite() || self.divergence_base < 2.0 {
            return Err(ConfigError::DivergenceBase(self.divergence_base));
        }
        Ok(())
    }

    /// Apply path and worker overrides. `lookup(primary, aliases)` returns the
    /// override value if one is set; [`super::env_optional`] in production.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str, &[&str]) -> Option<String>,
    {
        if let Some(v) = lookup(path_keys::STYLEFIT_DATA_DIR, path_keys::DATA_DIR_ALIASES) {
            self.paths.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(path_keys::STYLEFIT_OUTPUT_DIR, path_keys::OUTPUT_DIR_ALIASES) {
            self.paths.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(
            path_keys::STYLEFIT_CENTROID_CACHE,
            path_keys::CENTROID_CACHE_ALIASES,
        ) {
            self.paths.centroid_cache = PathBuf::from(v);
        }
        if let Some(v) = lookup(path_keys::STYLEFIT_PERSONA_DIR, path_keys::PERSONA_DIR_ALIASES) {
            self.persona_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(runtime_keys::STYLEFIT_WORKERS, runtime_keys::WORKERS_ALIASES) {
            self.workers = v.parse().map_err(|_| ConfigError::InvalidOverride {
                key: runtime_keys::STYLEFIT_WORKERS.to_string(),
                value: v.clone(),
            })?;
        }
        Ok(())
    }
}

/// Logging settings: quiet, log_level, log_json.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::STYLEFIT_QUIET, obv_keys::QUIET_ALIASES, false),
                log_level: env_or(
                    obv_keys::STYLEFIT_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || "stylefit=info".to_string(),
                ),
                log_json: env_bool(obv_keys::STYLEFIT_LOG_JSON, obv_keys::LOG_JSON_ALIASES, false),
            }
        })
    }
}
