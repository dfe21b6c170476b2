//! stylefit eval: turns input records into scored rows.
//!
//! [`input`] loads and extracts records, [`content`] computes the content
//! sub-scores, [`composite`] combines them with the style score, the
//! [`orchestrator`] runs a batch in parallel, and [`aggregate`] summarises it.

pub mod aggregate;
pub mod composite;
pub mod content;
pub mod error;
pub mod input;
pub mod item;
pub mod orchestrator;
pub mod row;

pub use aggregate::{aggregate, summarize, CorpusAggregates, MetricStats, MetricTable, NONE_KEY};
pub use composite::{content_quality, overall_quality};
pub use content::{ContentScorer, ContentScores, RougeScore, RougeScores, StandardContentScorer};
pub use error::{ErrorKind, InputError, ItemError, MetricFailure};
pub use input::{load_records, ExtractOptions, PersonaAssignments, RawRecord};
pub use item::{EvaluationItem, ParsedRecord, PrecomputedScores};
pub use orchestrator::{BatchOutcome, CentroidSetup, Orchestrator, RunSummary};
pub use row::{ItemRow, ItemStage, RowStatus, METRICS};
