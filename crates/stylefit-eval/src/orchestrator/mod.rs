//! Batch evaluation.
//!
//! 1. Raw records become items (or error rows).
//! 2. Centroid barrier: every persona referenced by an item, plus every
//!    configured corpus, gets a centroid before any scoring starts. The cache is
//!    written once here.
//! 3. Items are scored in parallel against the now read-only store. Output
//!    order matches input order.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use stylefit_core::centroid::{CentroidStore, LoadReport, PersonaSources, PrepareReport};
use stylefit_core::config::EvalConfig;
use stylefit_core::style::{score_candidate, StyleOutcome};
use stylefit_core::text::count_tokens;
use tracing::{debug, info, warn};

use crate::composite::{content_quality, overall_quality};
use crate::content::ContentScorer;
use crate::error::ErrorKind;
use crate::input::{extract_item, ExtractOptions, PersonaAssignments, RawRecord};
use crate::item::{EvaluationItem, ParsedRecord};
use crate::row::{ItemRow, ItemStage, RowStatus};

#[cfg(test)]
mod tests;

/// Counts and timestamps of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_items: usize,
    pub ok_items: usize,
    pub error_items: usize,
    pub style_scored: usize,
    pub style_skipped: usize,
    /// Every category is present, zero or not.
    pub errors: BTreeMap<ErrorKind, usize>,
    pub personas_built: Vec<String>,
    pub personas_reused: Vec<String>,
    pub personas_unavailable: Vec<String>,
}

const ALL_KINDS: [ErrorKind; 5] = [
    ErrorKind::MalformedInput,
    ErrorKind::EmptyPersonaCorpus,
    ErrorKind::CentroidDimensionMismatch,
    ErrorKind::DegenerateVector,
    ErrorKind::ExternalMetricFailure,
];

impl RunSummary {
    pub fn from_rows(
        rows: &[ItemRow],
        prepare: &PrepareReport,
        load: &LoadReport,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let ok: Vec<&ItemRow> = rows.iter().filter(|r| r.is_ok()).collect();
        let mut errors: BTreeMap<ErrorKind, usize> = ALL_KINDS.iter().map(|k| (*k, 0)).collect();
        for row in rows.iter().filter(|r| !r.is_ok()) {
            if let Some(kind) = row.error_kind {
                *errors.entry(kind).or_insert(0) += 1;
            }
        }
        let referenced: BTreeSet<&str> = ok.iter().filter_map(|r| r.persona_id.as_deref()).collect();
        errors.insert(
            ErrorKind::EmptyPersonaCorpus,
            prepare
                .empty_corpus
                .iter()
                .filter(|p| referenced.contains(p.as_str()))
                .count(),
        );
        errors.insert(ErrorKind::CentroidDimensionMismatch, load.dimension_mismatches());
        errors.insert(
            ErrorKind::DegenerateVector,
            ok.iter().filter(|r| r.style_degenerate).count(),
        );
        *errors.entry(ErrorKind::ExternalMetricFailure).or_insert(0) +=
            ok.iter().filter(|r| !r.metric_failures.is_empty()).count();

        Self {
            started_at,
            finished_at,
            total_items: rows.len(),
            ok_items: ok.len(),
            error_items: rows.len() - ok.len(),
            style_scored: ok.iter().filter(|r| !r.style_skipped).count(),
            style_skipped: ok.iter().filter(|r| r.style_skipped).count(),
            errors,
            personas_built: prepare.built.clone(),
            personas_reused: prepare.reused.clone(),
            personas_unavailable: prepare
                .unavailable()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn error_count(&self, kind: ErrorKind) -> usize {
        self.errors.get(&kind).copied().unwrap_or(0)
    }
}

/// Centroid state handed to [`Orchestrator::run`].
pub struct CentroidSetup<'a> {
    pub store: &'a mut CentroidStore,
    pub sources: &'a PersonaSources,
    pub load: &'a LoadReport,
    pub force_rebuild: bool,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub rows: Vec<ItemRow>,
    pub summary: RunSummary,
    pub prepare: PrepareReport,
}

/// Personas referenced by successfully extracted items.
pub fn required_personas(parsed: &[ParsedRecord]) -> BTreeSet<String> {
    parsed
        .iter()
        .filter_map(ParsedRecord::persona_id)
        .map(str::to_string)
        .collect()
}

pub struct Orchestrator<'a, S: ContentScorer> {
    config: &'a EvalConfig,
    scorer: &'a S,
}

impl<'a, S: ContentScorer> Orchestrator<'a, S> {
    pub fn new(config: &'a EvalConfig, scorer: &'a S) -> Self {
        Self { config, scorer }
    }

    /// Run `f` on a pool of `config.workers` threads, or on rayon's global pool for 0.
    fn with_workers<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        if self.config.workers == 0 {
            return f();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
        {
            Ok(pool) => pool.install(f),
            Err(e) => {
                warn!("could not build a {}-thread pool ({}); using the default", self.config.workers, e);
                f()
            }
        }
    }

    /// Field extraction for every raw record, in order.
    pub fn extract(&self, records: &[RawRecord], assignments: &PersonaAssignments) -> Vec<ParsedRecord> {
        let opts = ExtractOptions {
            fields: &self.config.fields,
            assignments,
            learned_quality_raw_range: self.config.learned_quality_raw_range,
        };
        records.iter().map(|r| extract_item(r, &opts)).collect()
    }

    /// Score one item. Never fails: missing pieces become `None` and flags.
    pub fn score_item(&self, item: &EvaluationItem, store: &CentroidStore) -> ItemRow {
        let style = score_candidate(
            store,
            item.persona_id.as_deref(),
            &item.candidate_text,
            self.config.divergence_base,
        );
        let style_stage = if style.is_skipped() {
            ItemStage::StyleSkipped
        } else {
            ItemStage::StyleScored
        };
        debug!("item {}: {} ({:?})", item.item_id, style_stage, style);

        let content = self.scorer.score(item);
        for failure in &content.failures {
            debug!("item {}: {}", item.item_id, failure);
        }
        let composite = content_quality(
            content.overlap,
            content.embedding_similarity,
            content.learned_quality,
            &self.config.content_weights,
            &self.config.content_fallback_weights,
        );
        let overall = overall_quality(composite, style.similarity(), &self.config.overall_weights);

        let src_tokens = count_tokens(&item.source_text);
        let cand_tokens = count_tokens(&item.candidate_text);
        let compression_ratio = if src_tokens > 0 {
            cand_tokens as f64 / src_tokens as f64
        } else {
            0.0
        };

        ItemRow {
            item_id: item.item_id.clone(),
            source_file: item.source_file.clone(),
            persona_id: item.persona_id.clone(),
            status: RowStatus::Ok,
            stage: ItemStage::Composited,
            error_kind: None,
            error_message: None,
            style_similarity: style.similarity(),
            style_skipped: style.is_skipped(),
            style_skip_reason: style.skip_reason(),
            style_degenerate: matches!(style, StyleOutcome::Scored { degenerate: true, .. }),
            overlap: content.overlap,
            embedding_similarity: content.embedding_similarity,
            learned_quality: content.learned_quality,
            content_quality: composite,
            overall_quality: overall,
            rouge: content.rouge,
            src_tokens: Some(src_tokens),
            ref_tokens: Some(count_tokens(&item.reference_text)),
            cand_tokens: Some(cand_tokens),
            compression_ratio: Some(compression_ratio),
            metric_failures: content.failures,
            metadata: item.metadata.clone(),
        }
    }

    fn row_for(&self, parsed: &ParsedRecord, store: &CentroidStore) -> ItemRow {
        match parsed {
            ParsedRecord::Item(item) => self.score_item(item, store),
            ParsedRecord::Failed {
                item_id,
                source_file,
                error,
            } => ItemRow::error(item_id.as_str(), source_file.as_str(), error.kind(), error.to_string()),
        }
    }

    /// Like [`Self::row_for`], but a panic while scoring becomes an error row.
    fn contained_row_for(&self, parsed: &ParsedRecord, store: &CentroidStore) -> ItemRow {
        match panic::catch_unwind(AssertUnwindSafe(|| self.row_for(parsed, store))) {
            Ok(row) => row,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!("item {}: scoring panicked: {}", parsed.item_id(), message);
                let mut row = ItemRow::error(
                    parsed.item_id(),
                    parsed.source_file(),
                    ErrorKind::ExternalMetricFailure,
                    format!("scoring panicked: {}", message),
                );
                row.persona_id = parsed.persona_id().map(str::to_string);
                row
            }
        }
    }

    /// Score every parsed record in parallel. One row per record, input order.
    pub fn score_all(&self, parsed: &[ParsedRecord], store: &CentroidStore) -> Vec<ItemRow> {
        self.with_workers(|| {
            parsed
                .par_iter()
                .map(|p| self.contained_row_for(p, store))
                .collect()
        })
    }

    /// Extract, prepare centroids, score and summarise one batch.
    pub fn run(
        &self,
        records: &[RawRecord],
        assignments: &PersonaAssignments,
        setup: CentroidSetup<'_>,
    ) -> BatchOutcome {
        let started_at = Utc::now();

        let extract_start = Instant::now();
        let parsed = self.extract(records, assignments);
        let failed = parsed
            .iter()
            .filter(|p| matches!(p, ParsedRecord::Failed { .. }))
            .count();
        info!(
            "Record extraction completed - duration={:.2}s, items={}, malformed={}",
            extract_start.elapsed().as_secs_f32(),
            parsed.len(),
            failed
        );

        let barrier_start = Instant::now();
        let required = required_personas(&parsed);
        let prepare = setup
            .store
            .prepare(setup.sources, &required, setup.force_rebuild, setup.load);
        if prepare.changed() {
            if let Err(e) = setup.store.persist() {
                warn!("centroid cache not written: {}", e);
            }
        }
        info!(
            "Centroid barrier completed - duration={:.2}s, required={}, built={}, reused={}",
            barrier_start.elapsed().as_secs_f32(),
            required.len(),
            prepare.built.len(),
            prepare.reused.len()
        );
        if !required.is_empty() && setup.store.is_empty() {
            warn!("no persona centroid could be loaded or built; every item will be style-skipped");
        }

        let score_start = Instant::now();
        let store: &CentroidStore = &*setup.store;
        let rows = self.score_all(&parsed, store);
        info!(
            "Scoring completed - duration={:.2}s, rows={}",
            score_start.elapsed().as_secs_f32(),
            rows.len()
        );

        let summary = RunSummary::from_rows(&rows, &prepare, setup.load, started_at, Utc::now());
        BatchOutcome {
            rows,
            summary,
            prepare,
        }
    }
}
