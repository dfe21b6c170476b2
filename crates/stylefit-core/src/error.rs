//! Error taxonomy for the style core.
//!
//! Each enum covers one failure domain so callers can decide containment per
//! category: a `BuildError` only disables style scoring for one persona, a
//! `CacheError::DimensionMismatch` forces a rebuild, a `ConfigError` is fatal at
//! load time, and a `DegenerateVectorError` never leaves the similarity scorer.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a persona corpus into a centroid.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("persona '{persona}' has no reference samples")]
    EmptyPersonaCorpus { persona: String },

    #[error("failed to read corpus for persona '{persona}' at {path}: {source}")]
    CorpusRead {
        persona: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn persona(&self) -> &str {
        match self {
            Self::EmptyPersonaCorpus { persona } | Self::CorpusRead { persona, .. } => persona,
        }
    }
}

/// Failures reading, validating or writing the persisted centroid cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cached centroid for '{persona}' has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        persona: String,
        expected: usize,
        found: usize,
    },

    #[error("cached centroid for '{persona}' is not an array of numbers")]
    NotAnArray { persona: String },

    #[error("cached centroid for '{persona}' has invalid value {value} at index {index}")]
    InvalidValue {
        persona: String,
        index: usize,
        value: f64,
    },

    #[error("read centroid cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse centroid cache {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("write centroid cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize centroid cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration problems. Always fatal: a run with bad weights would produce
/// numbers nobody can compare.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("weight {group}.{name} = {value} is outside [0, 1]")]
    WeightOutOfRange {
        group: &'static str,
        name: &'static str,
        value: f64,
    },

    #[error("weights in {group} sum to {sum}, expected 1.0 (±{tolerance})")]
    WeightSum {
        group: &'static str,
        sum: f64,
        tolerance: f64,
    },

    #[error("divergence_base must be a finite number >= 2 so JSD stays within [0, 1], got {0}")]
    DivergenceBase(f64),

    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },
}

/// Which side of a comparison produced a zero-mass distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSide {
    Candidate,
    Centroid,
}

impl fmt::Display for VectorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate => f.write_str("candidate"),
            Self::Centroid => f.write_str("centroid"),
        }
    }
}

/// A feature vector summed to zero and cannot be normalised into a distribution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{side} feature vector sums to zero; similarity is undefined")]
pub struct DegenerateVectorError {
    pub side: VectorSide,
}
