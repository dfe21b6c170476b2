//! The per-item output row.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use stylefit_core::style::SkipReason;

use crate::content::RougeScores;
use crate::error::{ErrorKind, MetricFailure};

/// Last pipeline stage an item reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    Loaded,
    FeaturesExtracted,
    StyleScored,
    StyleSkipped,
    ContentScored,
    Composited,
    Written,
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Loaded => "loaded",
            Self::FeaturesExtracted => "features_extracted",
            Self::StyleScored => "style_scored",
            Self::StyleSkipped => "style_skipped",
            Self::ContentScored => "content_scored",
            Self::Composited => "composited",
            Self::Written => "written",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Ok,
    Error,
}

/// Numeric row metrics that are aggregated, in report order.
pub const METRICS: [&str; 9] = [
    "style_similarity",
    "overlap",
    "embedding_similarity",
    "learned_quality",
    "content_quality",
    "overall_quality",
    "compression_ratio",
    "rouge1_f",
    "rouge2_f",
];

/// Metrics derived from content scoring. Rows with a failed content metric
/// keep these values but do not contribute them to aggregates.
pub const CONTENT_DERIVED: [&str; 7] = [
    "overlap",
    "embedding_similarity",
    "learned_quality",
    "content_quality",
    "overall_quality",
    "rouge1_f",
    "rouge2_f",
];

/// One output row per input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRow {
    pub item_id: String,
    pub source_file: String,
    pub persona_id: Option<String>,
    pub status: RowStatus,
    pub stage: ItemStage,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,

    pub style_similarity: Option<f64>,
    pub style_skipped: bool,
    pub style_skip_reason: Option<SkipReason>,
    pub style_degenerate: bool,

    pub overlap: Option<f64>,
    pub embedding_similarity: Option<f64>,
    pub learned_quality: Option<f64>,
    pub content_quality: Option<f64>,
    pub overall_quality: Option<f64>,

    pub rouge: Option<RougeScores>,
    pub src_tokens: Option<usize>,
    pub ref_tokens: Option<usize>,
    pub cand_tokens: Option<usize>,
    pub compression_ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_failures: Vec<MetricFailure>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl ItemRow {
    /// Row for an item that never got past loading.
    pub fn error(
        item_id: impl Into<String>,
        source_file: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            source_file: source_file.into(),
            persona_id: None,
            status: RowStatus::Error,
            stage: ItemStage::Loaded,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            style_similarity: None,
            style_skipped: false,
            style_skip_reason: None,
            style_degenerate: false,
            overlap: None,
            embedding_similarity: None,
            learned_quality: None,
            content_quality: None,
            overall_quality: None,
            rouge: None,
            src_tokens: None,
            ref_tokens: None,
            cand_tokens: None,
            compression_ratio: None,
            metric_failures: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RowStatus::Ok
    }

    /// Value of one of [`METRICS`] for this row.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "style_similarity" => self.style_similarity,
            "overlap" => self.overlap,
            "embedding_similarity" => self.embedding_similarity,
            "learned_quality" => self.learned_quality,
            "content_quality" => self.content_quality,
            "overall_quality" => self.overall_quality,
            "compression_ratio" => self.compression_ratio,
            "rouge1_f" => self.rouge.map(|r| r.rouge1.f),
            "rouge2_f" => self.rouge.map(|r| r.rouge2.f),
            "rougeLsum_f" => self.rouge.map(|r| r.rouge_lsum.f),
            _ => None,
        }
    }

    /// Value of `name` as it enters aggregates: content-derived metrics are
    /// withheld when any content metric failed for this row.
    pub fn aggregate_metric(&self, name: &str) -> Option<f64> {
        if !self.metric_failures.is_empty() && CONTENT_DERIVED.contains(&name) {
            return None;
        }
        self.metric(name)
    }

    /// Metadata value rendered as a grouping key.
    pub fn group_value(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// `title` passthrough for report tables, when present.
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("document_title").and_then(Value::as_str)
    }
}
