use super::*;
use crate::aggregate::aggregate;
use crate::content::{ContentScores, StandardContentScorer};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use stylefit_core::centroid::build_centroid;
use stylefit_core::style::SkipReason;

const FORMAL: &[&str] = &[
    "The quarterly assessment indicates that operational expenditures remained within the projected parameters established by the finance committee during the preceding fiscal year.",
    "Following careful examination of the available evidence, the review board concluded that the proposed regulatory framework requires substantial revision before implementation.",
    "The institution maintains that its governance procedures satisfy the statutory obligations imposed by the relevant oversight authorities in every jurisdiction.",
];
const CANDIDATE: &str =
    "The committee approved the measure unanimously after extensive deliberation.";

/// Fixed sub-scores regardless of the item.
struct FixedScorer(Option<f64>, Option<f64>, Option<f64>);

impl ContentScorer for FixedScorer {
    fn score(&self, _item: &EvaluationItem) -> ContentScores {
        ContentScores {
            overlap: self.0,
            embedding_similarity: self.1,
            learned_quality: self.2,
            ..ContentScores::default()
        }
    }
}

fn record(id: &str, persona: Option<&str>, candidate: &str) -> RawRecord {
    let mut value = json!({
        "write_id": id,
        "document_content": "The board met on Tuesday to review the proposed budget and, after a long debate, voted to approve it with minor amendments.",
        "expected_summary": "The board approved the budget with minor amendments.",
        "generated_summary": candidate,
        "bertscore_f1": 0.88,
        "metadata": { "sector": "public" }
    });
    if let Some(p) = persona {
        value["persona"] = json!(p);
    }
    RawRecord::Parsed {
        source_file: "batch.jsonl".to_string(),
        index: 0,
        value,
    }
}

fn write_personas(dir: &Path) -> PersonaSources {
    fs::write(dir.join("formal.txt"), FORMAL.join("\n\n")).unwrap();
    fs::write(
        dir.join("exclamatory.txt"),
        "This is amazing! Love it!\n\nWow! So cool! Best day ever!\n\nYes! We did it! Incredible!",
    )
    .unwrap();
    PersonaSources::discover(dir)
}

fn run_with<S: ContentScorer>(
    config: &EvalConfig,
    scorer: &S,
    records: &[RawRecord],
    sources: &PersonaSources,
    store: &mut CentroidStore,
) -> BatchOutcome {
    let load = LoadReport::default();
    Orchestrator::new(config, scorer).run(
        records,
        &PersonaAssignments::new(),
        CentroidSetup {
            store,
            sources,
            load: &load,
            force_rebuild: false,
        },
    )
}

#[test]
fn test_formal_candidate_scores_higher_against_formal_persona() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_personas(tmp.path());
    let mut store = CentroidStore::in_memory();
    let records = vec![
        record("a1", Some("formal"), CANDIDATE),
        record("a2", Some("exclamatory"), CANDIDATE),
    ];
    let out = run_with(
        &EvalConfig::default(),
        &StandardContentScorer,
        &records,
        &sources,
        &mut store,
    );

    let formal = out.rows[0].style_similarity.unwrap();
    let excl = out.rows[1].style_similarity.unwrap();
    assert!(formal >= 0.6, "formal similarity {}", formal);
    assert!(excl < formal, "exclamatory {} vs formal {}", excl, formal);
    assert_eq!(out.summary.style_scored, 2);
    assert_eq!(out.prepare.built, vec!["exclamatory", "formal"]);
}

#[test]
fn test_unknown_persona_is_style_skipped_but_aggregated_for_content() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_personas(tmp.path());
    let mut store = CentroidStore::in_memory();
    let records = vec![
        record("b1", Some("X"), CANDIDATE),
        record("b2", None, CANDIDATE),
        record("b3", Some("formal"), CANDIDATE),
    ];
    let config = EvalConfig::default();
    let out = run_with(&config, &StandardContentScorer, &records, &sources, &mut store);

    let x = &out.rows[0];
    assert!(x.is_ok());
    assert!(x.style_skipped);
    assert_eq!(x.style_similarity, None);
    assert_eq!(x.style_skip_reason, Some(SkipReason::NoCentroid));
    assert_eq!(x.overall_quality, x.content_quality);
    assert_eq!(out.rows[1].style_skip_reason, Some(SkipReason::NoPersona));
    assert_eq!(out.summary.personas_unavailable, vec!["X"]);
    assert_eq!(out.summary.style_skipped, 2);

    let agg = aggregate(&out.rows, &config.group_by);
    assert_eq!(agg.overall["content_quality"].count, 3);
    assert_eq!(agg.overall["style_similarity"].count, 1);
    assert!(agg.by_persona.contains_key("X"));
    assert!(agg.by_persona.contains_key("(none)"));
}

#[test]
fn test_overall_uses_fallback_weights_without_learned_quality() {
    let mut store = CentroidStore::in_memory();
    store.insert("formal", build_centroid("formal", FORMAL).unwrap());
    let config = EvalConfig::default();
    let scorer = FixedScorer(Some(0.8), Some(0.9), None);
    let out = run_with(
        &config,
        &scorer,
        &[record("c1", Some("formal"), CANDIDATE)],
        &PersonaSources::new(),
        &mut store,
    );

    let row = &out.rows[0];
    assert!((row.content_quality.unwrap() - 0.86).abs() < 1e-12);
    let style = row.style_similarity.unwrap();
    let expected = 0.7 * 0.86 + 0.3 * style;
    assert!((row.overall_quality.unwrap() - expected).abs() < 1e-12);
    assert_eq!(out.prepare.reused, vec!["formal"]);
}

#[test]
fn test_hundred_items_with_five_malformed() {
    let mut store = CentroidStore::in_memory();
    store.insert("formal", build_centroid("formal", FORMAL).unwrap());
    let mut records = Vec::new();
    for i in 0..100 {
        let mut r = record(&format!("item-{:03}", i), Some("formal"), CANDIDATE);
        if i % 20 == 7 {
            if let RawRecord::Parsed { value, .. } = &mut r {
                value
                    .as_object_mut()
                    .unwrap()
                    .remove("expected_summary");
            }
        }
        records.push(r);
    }
    let mut config = EvalConfig::default();
    config.workers = 4;
    let out = run_with(
        &config,
        &StandardContentScorer,
        &records,
        &PersonaSources::new(),
        &mut store,
    );

    assert_eq!(out.rows.len(), 100);
    assert_eq!(out.summary.ok_items, 95);
    assert_eq!(out.summary.error_items, 5);
    assert_eq!(out.summary.error_count(ErrorKind::MalformedInput), 5);
    for (i, row) in out.rows.iter().enumerate() {
        assert_eq!(row.item_id, format!("item-{:03}", i));
        if i % 20 == 7 {
            assert_eq!(row.status, RowStatus::Error);
            assert_eq!(row.error_kind, Some(ErrorKind::MalformedInput));
            assert_eq!(row.stage, ItemStage::Loaded);
        } else {
            assert_eq!(row.stage, ItemStage::Composited);
        }
    }

    let agg = aggregate(&out.rows, &[]);
    assert_eq!(agg.items, 95);
    assert_eq!(agg.overall["content_quality"].count, 95);
    assert_eq!(agg.overall["style_similarity"].count, 95);
}

#[test]
fn test_degenerate_candidate_is_flagged_and_counted() {
    let mut store = CentroidStore::in_memory();
    store.insert("formal", build_centroid("formal", FORMAL).unwrap());
    let out = run_with(
        &EvalConfig::default(),
        &StandardContentScorer,
        &[record("d1", Some("formal"), "?!...")],
        &PersonaSources::new(),
        &mut store,
    );
    let row = &out.rows[0];
    assert!(row.style_degenerate);
    assert_eq!(row.style_similarity, Some(0.0));
    assert_eq!(out.summary.error_count(ErrorKind::DegenerateVector), 1);
}

#[test]
fn test_empty_persona_corpus_skips_its_items() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("blank.txt"), "\n\n\n").unwrap();
    let sources = PersonaSources::discover(tmp.path());
    let mut store = CentroidStore::in_memory();
    let out = run_with(
        &EvalConfig::default(),
        &StandardContentScorer,
        &[record("e1", Some("blank"), CANDIDATE)],
        &sources,
        &mut store,
    );
    assert!(out.rows[0].style_skipped);
    assert!(out.rows[0].is_ok());
    assert_eq!(out.summary.error_count(ErrorKind::EmptyPersonaCorpus), 1);
}

#[test]
fn test_unreferenced_empty_corpus_is_not_counted() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("blank.txt"), "\n\n\n").unwrap();
    fs::write(tmp.path().join("formal.txt"), FORMAL.join("\n\n")).unwrap();
    let sources = PersonaSources::discover(tmp.path());
    let mut store = CentroidStore::in_memory();
    let out = run_with(
        &EvalConfig::default(),
        &StandardContentScorer,
        &[record("e2", Some("formal"), CANDIDATE)],
        &sources,
        &mut store,
    );
    assert_eq!(out.prepare.empty_corpus, vec!["blank"]);
    assert_eq!(out.summary.error_count(ErrorKind::EmptyPersonaCorpus), 0);
}

#[test]
fn test_missing_embedding_counts_external_metric_failure() {
    let mut store = CentroidStore::in_memory();
    let mut r = record("f1", None, CANDIDATE);
    if let RawRecord::Parsed { value, .. } = &mut r {
        value.as_object_mut().unwrap().remove("bertscore_f1");
    }
    let out = run_with(
        &EvalConfig::default(),
        &StandardContentScorer,
        &[r],
        &PersonaSources::new(),
        &mut store,
    );
    let row = &out.rows[0];
    assert!(row.is_ok());
    assert_eq!(row.embedding_similarity, None);
    assert!((row.content_quality.unwrap() - row.overlap.unwrap()).abs() < 1e-12);
    assert_eq!(out.summary.error_count(ErrorKind::ExternalMetricFailure), 1);
}

#[test]
fn test_metric_failure_excluded_from_content_aggregates() {
    let mut store = CentroidStore::in_memory();
    let mut partial = record("f3", None, CANDIDATE);
    if let RawRecord::Parsed { value, .. } = &mut partial {
        value.as_object_mut().unwrap().remove("bertscore_f1");
    }
    let config = EvalConfig::default();
    let out = run_with(
        &config,
        &StandardContentScorer,
        &[record("f2", None, CANDIDATE), partial],
        &PersonaSources::new(),
        &mut store,
    );
    assert!(out.rows.iter().all(ItemRow::is_ok));
    assert!(out.rows[1].content_quality.is_some());

    let agg = aggregate(&out.rows, &config.group_by);
    assert_eq!(agg.items, 2);
    assert_eq!(agg.overall["content_quality"].count, 1);
    assert_eq!(agg.overall["overlap"].count, 1);
    assert_eq!(
        agg.overall["content_quality"].mean,
        out.rows[0].content_quality.unwrap()
    );
    assert_eq!(agg.overall["compression_ratio"].count, 2);
}

/// Panics on one item id, scores everything else.
struct PanicOn(&'static str);

impl ContentScorer for PanicOn {
    fn score(&self, item: &EvaluationItem) -> ContentScores {
        if item.item_id == self.0 {
            panic!("scorer exploded on {}", item.item_id);
        }
        FixedScorer(Some(0.5), Some(0.5), Some(0.5)).score(item)
    }
}

#[test]
fn test_panicking_item_does_not_abort_batch() {
    let mut store = CentroidStore::in_memory();
    let records: Vec<RawRecord> = (0..6)
        .map(|i| record(&format!("p{}", i), None, CANDIDATE))
        .collect();
    let mut config = EvalConfig::default();
    config.workers = 2;
    let out = run_with(&config, &PanicOn("p3"), &records, &PersonaSources::new(), &mut store);

    assert_eq!(out.rows.len(), 6);
    assert_eq!(out.summary.ok_items, 5);
    let failed = &out.rows[3];
    assert_eq!(failed.item_id, "p3");
    assert_eq!(failed.status, RowStatus::Error);
    assert_eq!(failed.error_kind, Some(ErrorKind::ExternalMetricFailure));
    assert!(failed.error_message.as_deref().unwrap().contains("scorer exploded on p3"));
    assert_eq!(out.summary.error_count(ErrorKind::ExternalMetricFailure), 1);
}

#[test]
fn test_cache_written_after_barrier() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_personas(tmp.path());
    let cache = tmp.path().join("out").join("persona_centroids.json");
    let (mut store, load) = CentroidStore::load(&cache).unwrap();
    let config = EvalConfig::default();
    let out = Orchestrator::new(&config, &StandardContentScorer).run(
        &[record("g1", Some("formal"), CANDIDATE)],
        &PersonaAssignments::new(),
        CentroidSetup {
            store: &mut store,
            sources: &sources,
            load: &load,
            force_rebuild: false,
        },
    );
    assert_eq!(out.rows.len(), 1);
    let saved: BTreeMap<String, Value> =
        serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(saved.keys().collect::<Vec<_>>(), vec!["exclamatory", "formal"]);
}

#[test]
fn test_summary_serializes_every_error_category() {
    let mut store = CentroidStore::in_memory();
    let out = run_with(
        &EvalConfig::default(),
        &StandardContentScorer,
        &[record("h1", None, CANDIDATE)],
        &PersonaSources::new(),
        &mut store,
    );
    let json = serde_json::to_value(&out.summary).unwrap();
    let errors = json["errors"].as_object().unwrap();
    for key in [
        "malformed_input",
        "empty_persona_corpus",
        "centroid_dimension_mismatch",
        "degenerate_vector",
        "external_metric_failure",
    ] {
        assert!(errors.contains_key(key), "missing {}", key);
    }
}
