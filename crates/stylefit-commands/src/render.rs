//! Markdown report.

use std::cmp::Ordering;

use stylefit_eval::aggregate::{CorpusAggregates, MetricStats, MetricTable};
use stylefit_eval::error::ErrorKind;
use stylefit_eval::orchestrator::RunSummary;
use stylefit_eval::row::ItemRow;

const CONTENT_METRICS: &[&str] = &[
    "overlap",
    "rouge1_f",
    "rouge2_f",
    "embedding_similarity",
    "learned_quality",
    "content_quality",
    "overall_quality",
    "compression_ratio",
];
const STYLE_METRICS: &[&str] = &["style_similarity"];
const TOP_N: usize = 5;

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn num(v: Option<f64>) -> String {
    v.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}

fn pick<'a>(table: &'a MetricTable, names: &[&str]) -> Vec<(&'a str, &'a MetricStats)> {
    names
        .iter()
        .filter_map(|n| table.get_key_value(*n))
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

fn full_table(md: &mut String, title: &str, rows: &[(&str, &MetricStats)]) {
    md.push_str(&format!("### {}\n\n", title));
    if rows.is_empty() {
        md.push_str("No data available.\n\n");
        return;
    }
    md.push_str("| Metric | Mean | Median | Std Dev | Min | Max | Count |\n");
    md.push_str("|--------|------|--------|---------|-----|-----|-------|\n");
    for (name, s) in rows {
        md.push_str(&format!(
            "| {} | {:.4} | {:.4} | {} | {:.4} | {:.4} | {} |\n",
            name,
            s.mean,
            s.median,
            num(s.std),
            s.min,
            s.max,
            s.count
        ));
    }
    md.push('\n');
}

fn short_table(md: &mut String, title: &str, rows: &[(&str, &MetricStats)]) {
    if rows.is_empty() {
        return;
    }
    md.push_str(&format!("#### {}\n\n", title));
    md.push_str("| Metric | Mean | Median | Std Dev | Count |\n");
    md.push_str("|--------|------|--------|---------|-------|\n");
    for (name, s) in rows {
        md.push_str(&format!(
            "| {} | {:.4} | {:.4} | {} | {} |\n",
            name,
            s.mean,
            s.median,
            num(s.std),
            s.count
        ));
    }
    md.push('\n');
}

/// Ok rows that have `metric`, best first. Ties keep input order.
fn ranked<'a>(rows: &'a [ItemRow], metric: &str) -> Vec<(&'a ItemRow, f64)> {
    let mut scored: Vec<(&ItemRow, f64)> = rows
        .iter()
        .filter(|r| r.is_ok())
        .filter_map(|r| r.metric(metric).filter(|v| v.is_finite()).map(|v| (r, v)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
}

fn bottom<'a>(ranked: &[(&'a ItemRow, f64)]) -> Vec<(&'a ItemRow, f64)> {
    let mut worst: Vec<_> = ranked.iter().rev().take(TOP_N).copied().collect();
    worst.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    worst
}

fn content_rows(md: &mut String, title: &str, rows: &[(&ItemRow, f64)]) {
    md.push_str(&format!("### {}\n\n", title));
    md.push_str("| Item | Title | Content Quality | ROUGE-Lsum F | Embedding Similarity |\n");
    md.push_str("|------|-------|-----------------|--------------|----------------------|\n");
    for (row, quality) in rows {
        md.push_str(&format!(
            "| {} | {} | {:.4} | {} | {} |\n",
            cell(&row.item_id),
            cell(row.title().unwrap_or("")),
            quality,
            num(row.metric("rougeLsum_f")),
            num(row.embedding_similarity)
        ));
    }
    md.push('\n');
}

fn style_rows(md: &mut String, title: &str, rows: &[(&ItemRow, f64)]) {
    md.push_str(&format!("### {}\n\n", title));
    md.push_str("| Item | Title | Persona | Style Similarity |\n");
    md.push_str("|------|-------|---------|------------------|\n");
    for (row, similarity) in rows {
        md.push_str(&format!(
            "| {} | {} | {} | {:.4} |\n",
            cell(&row.item_id),
            cell(row.title().unwrap_or("")),
            cell(row.persona_id.as_deref().unwrap_or("")),
            similarity
        ));
    }
    md.push('\n');
}

fn error_counts(rows: &[ItemRow], summary: Option<&RunSummary>) -> Vec<(ErrorKind, usize)> {
    match summary {
        Some(s) => s.errors.iter().map(|(k, n)| (*k, *n)).collect(),
        None => {
            let mut counts = std::collections::BTreeMap::new();
            for kind in rows.iter().filter_map(|r| r.error_kind) {
                *counts.entry(kind).or_insert(0usize) += 1;
            }
            counts.into_iter().collect()
        }
    }
}

/// Render the evaluation report. `summary` adds run-level error counts; without
/// it only the per-row errors are counted.
pub fn render_report(
    rows: &[ItemRow],
    aggregates: &CorpusAggregates,
    summary: Option<&RunSummary>,
) -> String {
    let mut md = String::new();
    md.push_str("# Persona Summarization Evaluation Report\n\n");
    md.push_str(&format!("**Total Items Evaluated:** {}\n\n", rows.len()));
    if let Some(s) = summary {
        md.push_str(&format!(
            "**Run:** {} to {}\n\n",
            s.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            s.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    md.push_str("## Overall Statistics\n\n");
    full_table(&mut md, "Content Quality Metrics", &pick(&aggregates.overall, CONTENT_METRICS));
    full_table(&mut md, "Style Fidelity Metrics", &pick(&aggregates.overall, STYLE_METRICS));

    if !aggregates.by_persona.is_empty() {
        md.push_str("## Per-Persona Results\n\n");
        for (persona, table) in &aggregates.by_persona {
            md.push_str(&format!("### Persona: {}\n\n", persona));
            short_table(&mut md, "Content Metrics", &pick(table, CONTENT_METRICS));
            short_table(&mut md, "Style Metrics", &pick(table, STYLE_METRICS));
        }
    }

    for (key, groups) in &aggregates.by_group {
        md.push_str(&format!("## Results by {}\n\n", key));
        md.push_str("| Group | Items | Content Quality | Style Similarity | Overall Quality |\n");
        md.push_str("|-------|-------|-----------------|------------------|-----------------|\n");
        for (group, table) in groups {
            let mean = |m: &str| num(table.get(m).map(|s| s.mean));
            let items = table.get("content_quality").map_or(0, |s| s.count);
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                cell(group),
                items,
                mean("content_quality"),
                mean("style_similarity"),
                mean("overall_quality")
            ));
        }
        md.push('\n');
    }

    md.push_str("## Performance Analysis\n\n");
    let by_content = ranked(rows, "content_quality");
    if !by_content.is_empty() {
        let top: Vec<_> = by_content.iter().take(TOP_N).copied().collect();
        content_rows(&mut md, "Top 5 Summaries by Content Quality", &top);
        content_rows(&mut md, "Bottom 5 Summaries by Content Quality", &bottom(&by_content));
    }
    let by_style = ranked(rows, "style_similarity");
    if !by_style.is_empty() {
        let top: Vec<_> = by_style.iter().take(TOP_N).copied().collect();
        style_rows(&mut md, "Top 5 Summaries by Style Similarity", &top);
        style_rows(&mut md, "Bottom 5 Summaries by Style Similarity", &bottom(&by_style));
    }

    let ok: Vec<&ItemRow> = rows.iter().filter(|r| r.is_ok()).collect();
    let style_scored = ok.iter().filter(|r| !r.style_skipped).count();
    md.push_str("## Summary\n\n");
    md.push_str(&format!(
        "- **Items with style evaluation:** {} / {}\n",
        style_scored,
        rows.len()
    ));
    md.push_str(&format!(
        "- **Items skipped for style:** {}\n",
        ok.len() - style_scored
    ));
    md.push_str(&format!(
        "- **Items with errors:** {}\n",
        rows.len() - ok.len()
    ));
    if let Some(s) = aggregates.overall.get("content_quality") {
        md.push_str(&format!("- **Average content quality:** {:.4}\n", s.mean));
    }
    if let Some(s) = aggregates.overall.get("style_similarity") {
        md.push_str(&format!("- **Average style similarity:** {:.4}\n", s.mean));
    }

    let errors = error_counts(rows, summary);
    if !errors.is_empty() {
        md.push_str("\n### Errors\n\n");
        md.push_str("| Category | Count |\n");
        md.push_str("|----------|-------|\n");
        for (kind, n) in errors {
            md.push_str(&format!("| {} | {} |\n", kind, n));
        }
    }
    if let Some(s) = summary {
        if !s.personas_unavailable.is_empty() {
            md.push_str(&format!(
                "\nPersonas without a centroid: {}\n",
                s.personas_unavailable.join(", ")
            ));
        }
    }

    md
}
