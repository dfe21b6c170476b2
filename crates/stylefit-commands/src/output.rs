//! Run artifacts in the output directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use stylefit_eval::aggregate::CorpusAggregates;
use stylefit_eval::orchestrator::RunSummary;
use stylefit_eval::row::ItemRow;

pub const ROWS_FILE: &str = "per_item_metrics.jsonl";
pub const AGGREGATES_FILE: &str = "corpus_aggregates.json";
pub const SUMMARY_FILE: &str = "run_summary.json";
pub const REPORT_FILE: &str = "report.md";

/// One JSON object per line, in row order.
pub fn write_rows(path: &Path, rows: &[ItemRow]) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut w, row)?;
        w.write_all(b"\n")?;
    }
    w.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_rows(path: &Path) -> Result<Vec<ItemRow>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid row", path.display(), i + 1))
        })
        .collect()
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write rows, aggregates, summary and report into `dir`.
pub fn write_run(
    dir: &Path,
    rows: &[ItemRow],
    aggregates: &CorpusAggregates,
    summary: &RunSummary,
    report: &str,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    write_rows(&dir.join(ROWS_FILE), rows)?;
    write_json(&dir.join(AGGREGATES_FILE), aggregates)?;
    write_json(&dir.join(SUMMARY_FILE), summary)?;
    let report_path = dir.join(REPORT_FILE);
    fs::write(&report_path, report)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    Ok(())
}
