//! `stylefit evaluate`: one full batch pass.

use anyhow::{bail, Context, Result};
use std::fs;
use std::time::Instant;

use stylefit_eval::aggregate::aggregate;
use stylefit_eval::content::StandardContentScorer;
use stylefit_eval::error::ErrorKind;
use stylefit_eval::input::{load_records, PersonaAssignments};
use stylefit_eval::orchestrator::{BatchOutcome, CentroidSetup, Orchestrator, RunSummary};
use stylefit_eval::row::ItemStage;
use tracing::info;

use crate::context::{open_store, persona_sources, RunOverrides};
use crate::output::write_run;
use crate::render::render_report;

/// `stylefit evaluate`
///
/// Fatal: bad config, unreadable data path, no records, unwritable output
/// directory. Everything else ends up in the rows and the summary.
pub fn cmd_evaluate(overrides: &RunOverrides, force_rebuild: bool) -> Result<RunSummary> {
    let start = Instant::now();
    let config = overrides.load_config()?;

    let data_path = &config.paths.data_dir;
    let records = load_records(data_path)
        .with_context(|| format!("Failed to load records from {}", data_path.display()))?;
    if records.is_empty() {
        bail!("No records found under {}", data_path.display());
    }

    let out_dir = &config.paths.output_dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Output directory {} is not writable", out_dir.display()))?;

    let assignments = match &config.paths.persona_assignments {
        Some(path) => PersonaAssignments::load(path)
            .with_context(|| format!("Failed to load persona assignments {}", path.display()))?,
        None => PersonaAssignments::new(),
    };
    let sources = persona_sources(&config);
    let (mut store, load) = open_store(&config.paths.centroid_cache);

    let scorer = StandardContentScorer;
    let BatchOutcome { mut rows, summary, .. } = Orchestrator::new(&config, &scorer).run(
        &records,
        &assignments,
        CentroidSetup {
            store: &mut store,
            sources: &sources,
            load: &load,
            force_rebuild,
        },
    );

    for row in rows.iter_mut().filter(|r| r.is_ok()) {
        row.stage = ItemStage::Written;
    }
    let aggregates = aggregate(&rows, &config.group_by);
    let report = render_report(&rows, &aggregates, Some(&summary));
    write_run(out_dir, &rows, &aggregates, &summary, &report)?;

    info!(
        "Evaluation completed - duration={:.2}s, items={}, ok={}, errors={}, style_scored={}, style_skipped={}",
        start.elapsed().as_secs_f32(),
        summary.total_items,
        summary.ok_items,
        summary.error_items,
        summary.style_scored,
        summary.style_skipped
    );
    print_summary(&summary);
    eprintln!("Results written to {}", out_dir.display());
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!(
        "Summary: {} item(s), {} ok, {} error(s)",
        summary.total_items, summary.ok_items, summary.error_items
    );
    eprintln!(
        "  style: {} scored, {} skipped",
        summary.style_scored, summary.style_skipped
    );
    for (kind, n) in summary.errors.iter().filter(|(_, n)| **n > 0) {
        eprintln!("  ⚠ {}: {}", kind, n);
    }
    if !summary.personas_unavailable.is_empty() {
        eprintln!(
            "  ⚠ no centroid for: {}",
            summary.personas_unavailable.join(", ")
        );
    }
    if summary.error_count(ErrorKind::MalformedInput) > 0 {
        eprintln!("  see error_message in the per-item rows for details");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{read_json, read_rows, AGGREGATES_FILE, REPORT_FILE, ROWS_FILE, SUMMARY_FILE};
    use serde_json::json;
    use std::path::Path;
    use stylefit_eval::aggregate::CorpusAggregates;

    const FORMAL: &str = "The quarterly assessment indicates that operational expenditures remained within the projected parameters established by the finance committee during the preceding fiscal year.\n\nFollowing careful examination of the available evidence, the review board concluded that the proposed regulatory framework requires substantial revision before implementation.";

    fn write_data(dir: &Path, n: usize) {
        let mut lines = Vec::new();
        for i in 0..n {
            lines.push(
                json!({
                    "write_id": format!("w{}", i),
                    "document_title": format!("Doc {}", i),
                    "document_content": "The council met to discuss the annual budget and approved it after a short debate.",
                    "expected_summary": "The council approved the annual budget.",
                    "generated_summary": "The council approved the budget after debate.",
                    "persona": if i % 2 == 0 { "formal" } else { "unknown" },
                    "bertscore_f1": 0.9,
                    "bleurt": 0.2
                })
                .to_string(),
            );
        }
        lines.push("{not json".to_string());
        fs::write(dir.join("batch.jsonl"), lines.join("\n")).unwrap();
    }

    fn overrides(root: &Path) -> RunOverrides {
        let config = root.join("stylefit.yaml");
        fs::write(&config, "workers: 2\n").unwrap();
        RunOverrides {
            config: Some(config),
            data_dir: Some(root.join("data")),
            output_dir: Some(root.join("out")),
            persona_dir: Some(root.join("personas")),
            ..Default::default()
        }
    }

    fn setup() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("data")).unwrap();
        fs::create_dir_all(tmp.path().join("personas")).unwrap();
        fs::write(tmp.path().join("personas").join("formal.txt"), FORMAL).unwrap();
        tmp
    }

    #[test]
    fn test_evaluate_writes_all_outputs() {
        let tmp = setup();
        write_data(&tmp.path().join("data"), 6);
        let summary = cmd_evaluate(&overrides(tmp.path()), false).unwrap();

        assert_eq!(summary.total_items, 7);
        assert_eq!(summary.ok_items, 6);
        assert_eq!(summary.error_count(ErrorKind::MalformedInput), 1);
        assert_eq!(summary.style_scored, 3);
        assert_eq!(summary.style_skipped, 3);
        assert_eq!(summary.personas_unavailable, vec!["unknown"]);

        let out = tmp.path().join("out");
        for file in [ROWS_FILE, AGGREGATES_FILE, SUMMARY_FILE, REPORT_FILE, "persona_centroids.json"] {
            assert!(out.join(file).is_file(), "missing {}", file);
        }
        let rows = read_rows(&out.join(ROWS_FILE)).unwrap();
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().filter(|r| r.is_ok()).all(|r| r.stage == ItemStage::Written));
        let agg: CorpusAggregates = read_json(&out.join(AGGREGATES_FILE)).unwrap();
        assert_eq!(agg.items, 6);
        let saved: RunSummary = read_json(&out.join(SUMMARY_FILE)).unwrap();
        assert_eq!(saved, summary);
    }

    #[test]
    fn test_second_run_reuses_cache() {
        let tmp = setup();
        write_data(&tmp.path().join("data"), 2);
        let o = overrides(tmp.path());
        let first = cmd_evaluate(&o, false).unwrap();
        assert_eq!(first.personas_built, vec!["formal"]);
        let second = cmd_evaluate(&o, false).unwrap();
        assert!(second.personas_built.is_empty());
        assert_eq!(second.personas_reused, vec!["formal"]);
        let forced = cmd_evaluate(&o, true).unwrap();
        assert_eq!(forced.personas_built, vec!["formal"]);
    }

    #[test]
    fn test_no_records_is_fatal() {
        let tmp = setup();
        let err = cmd_evaluate(&overrides(tmp.path()), false).unwrap_err();
        assert!(err.to_string().contains("No records found"));
    }

    #[test]
    fn test_missing_data_path_is_fatal() {
        let tmp = setup();
        let mut o = overrides(tmp.path());
        o.data_dir = Some(tmp.path().join("nowhere"));
        assert!(cmd_evaluate(&o, false).is_err());
    }

    #[test]
    fn test_invalid_weights_are_fatal() {
        let tmp = setup();
        write_data(&tmp.path().join("data"), 1);
        let o = overrides(tmp.path());
        fs::write(
            o.config.as_ref().unwrap(),
            "overall_weights: { content: 0.9, style: 0.3 }\n",
        )
        .unwrap();
        let err = cmd_evaluate(&o, false).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_assignment_table_overrides_record_persona() {
        let tmp = setup();
        write_data(&tmp.path().join("data"), 2);
        let csv = tmp.path().join("assignments.csv");
        fs::write(&csv, "write_id,persona_id\nw1,formal\n").unwrap();
        let mut o = overrides(tmp.path());
        o.assignments = Some(csv);
        let summary = cmd_evaluate(&o, false).unwrap();
        assert_eq!(summary.style_scored, 2);
        assert!(summary.personas_unavailable.is_empty());
    }
}
