use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ItemError;

/// Scores produced outside this crate and carried on the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedScores {
    pub embedding_similarity: Option<f64>,
    /// Already mapped to [0, 1] when the raw range was [-1, 1].
    pub learned_quality: Option<f64>,
}

/// One input record. Immutable during evaluation; yields exactly one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub item_id: String,
    pub source_file: String,
    pub source_text: String,
    pub reference_text: String,
    pub candidate_text: String,
    pub persona_id: Option<String>,
    pub metadata: BTreeMap<String, Value>,
    pub precomputed: PrecomputedScores,
}

/// A record after field extraction: an item, or the reason it is not one.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRecord {
    Item(EvaluationItem),
    Failed {
        item_id: String,
        source_file: String,
        error: ItemError,
    },
}

impl ParsedRecord {
    pub fn item_id(&self) -> &str {
        match self {
            Self::Item(item) => &item.item_id,
            Self::Failed { item_id, .. } => item_id,
        }
    }

    pub fn source_file(&self) -> &str {
        match self {
            Self::Item(item) => &item.source_file,
            Self::Failed { source_file, .. } => source_file,
        }
    }

    pub fn persona_id(&self) -> Option<&str> {
        match self {
            Self::Item(item) => item.persona_id.as_deref(),
            Self::Failed { .. } => None,
        }
    }
}
