//! Per-item and input errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A record that cannot become an [`crate::EvaluationItem`]. The item gets an
/// error row; the batch continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("missing or non-string required field '{field}'")]
    MalformedInput { field: String },

    #[error("invalid record: {message}")]
    InvalidRecord { message: String },
}

impl ItemError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

/// A content collaborator produced no value for one sub-score of one item.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{metric}: {message}")]
pub struct MetricFailure {
    pub metric: String,
    pub message: String,
}

impl MetricFailure {
    pub fn new(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            message: message.into(),
        }
    }
}

/// Error categories counted in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    EmptyPersonaCorpus,
    CentroidDimensionMismatch,
    DegenerateVector,
    ExternalMetricFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MalformedInput => "malformed_input",
            Self::EmptyPersonaCorpus => "empty_persona_corpus",
            Self::CentroidDimensionMismatch => "centroid_dimension_mismatch",
            Self::DegenerateVector => "degenerate_vector",
            Self::ExternalMetricFailure => "external_metric_failure",
        };
        f.write_str(s)
    }
}

/// Failures that stop record loading altogether.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("data path {0} does not exist")]
    NotFound(PathBuf),

    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
