//! `stylefit report`: regenerate `report.md` from a finished run.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use stylefit_eval::aggregate::{aggregate, CorpusAggregates};
use stylefit_eval::orchestrator::RunSummary;
use tracing::{debug, warn};

use crate::context::RunOverrides;
use crate::output::{read_json, read_rows, AGGREGATES_FILE, REPORT_FILE, ROWS_FILE, SUMMARY_FILE};
use crate::render::render_report;

/// `stylefit report`
///
/// Reads the rows (required), aggregates (recomputed when missing) and run
/// summary (optional) from the output directory. Returns the report path.
pub fn cmd_report(overrides: &RunOverrides, out: Option<&Path>) -> Result<PathBuf> {
    let config = overrides.load_config()?;
    let dir = &config.paths.output_dir;

    let rows = read_rows(&dir.join(ROWS_FILE))?;
    let agg_path = dir.join(AGGREGATES_FILE);
    let aggregates: CorpusAggregates = if agg_path.is_file() {
        read_json(&agg_path)?
    } else {
        warn!("{} missing; recomputing aggregates from rows", agg_path.display());
        aggregate(&rows, &config.group_by)
    };
    let summary_path = dir.join(SUMMARY_FILE);
    let summary: Option<RunSummary> = match read_json(&summary_path) {
        Ok(s) => Some(s),
        Err(e) => {
            debug!("no run summary: {:#}", e);
            None
        }
    };

    let report = render_report(&rows, &aggregates, summary.as_ref());
    let target = out.map(Path::to_path_buf).unwrap_or_else(|| dir.join(REPORT_FILE));
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&target, report).with_context(|| format!("Failed to write {}", target.display()))?;
    eprintln!("Report generated: {}", target.display());
    Ok(target)
}
