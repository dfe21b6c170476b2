//! Corpus-level statistics over successfully scored rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::row::{ItemRow, METRICS};

/// Group key for rows without a persona or without a grouping value.
pub const NONE_KEY: &str = "(none)";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Metric name → statistics. Metrics without any value are omitted.
pub type MetricTable = BTreeMap<String, MetricStats>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusAggregates {
    /// Number of ok rows aggregated.
    pub items: usize,
    pub overall: MetricTable,
    pub by_persona: BTreeMap<String, MetricTable>,
    /// Metadata key → group value → table.
    #[serde(default)]
    pub by_group: BTreeMap<String, BTreeMap<String, MetricTable>>,
}

/// Statistics of `values`; `None` when empty.
pub fn summarize(values: &[f64]) -> Option<MetricStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    let std = (n >= 2).then(|| {
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    });
    Some(MetricStats {
        count: n,
        mean,
        median,
        std,
        min: sorted[0],
        max: sorted[n - 1],
    })
}

fn table(rows: &[&ItemRow]) -> MetricTable {
    METRICS
        .iter()
        .filter_map(|name| {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|r| r.aggregate_metric(name))
                .filter(|v| v.is_finite())
                .collect();
            summarize(&values).map(|s| (name.to_string(), s))
        })
        .collect()
}

fn grouped<'a, F>(rows: &[&'a ItemRow], key_of: F) -> BTreeMap<String, MetricTable>
where
    F: Fn(&ItemRow) -> Option<String>,
{
    let mut groups: BTreeMap<String, Vec<&'a ItemRow>> = BTreeMap::new();
    for &row in rows {
        let key = key_of(row).unwrap_or_else(|| NONE_KEY.to_string());
        groups.entry(key).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(k, members)| (k, table(&members)))
        .collect()
}

/// Aggregate the ok rows overall, by persona and by each `group_by` metadata key.
/// Error rows never contribute. Rows with a failed content metric contribute
/// only their style and length statistics.
pub fn aggregate(rows: &[ItemRow], group_by: &[String]) -> CorpusAggregates {
    let ok: Vec<&ItemRow> = rows.iter().filter(|r| r.is_ok()).collect();
    let by_group = group_by
        .iter()
        .map(|key| (key.clone(), grouped(&ok, |r| r.group_value(key))))
        .collect();
    CorpusAggregates {
        items: ok.len(),
        overall: table(&ok),
        by_persona: grouped(&ok, |r| r.persona_id.clone()),
        by_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, MetricFailure};
    use crate::row::RowStatus;
    use serde_json::json;

    fn ok_row(id: &str, persona: Option<&str>, content: f64, style: Option<f64>) -> ItemRow {
        let mut row = ItemRow::error(id, "f", ErrorKind::MalformedInput, "");
        row.status = RowStatus::Ok;
        row.error_kind = None;
        row.error_message = None;
        row.persona_id = persona.map(str::to_string);
        row.content_quality = Some(content);
        row.style_similarity = style;
        row.style_skipped = style.is_none();
        row
    }

    #[test]
    fn test_summarize() {
        let s = summarize(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        let expected_std = (5.0f64 / 3.0).sqrt();
        assert!((s.std.unwrap() - expected_std).abs() < 1e-12);

        let single = summarize(&[0.7]).unwrap();
        assert_eq!(single.median, 0.7);
        assert_eq!(single.std, None);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_error_rows_excluded() {
        let rows = vec![
            ok_row("1", Some("formal"), 0.5, Some(0.8)),
            ok_row("2", Some("formal"), 0.7, Some(0.6)),
            ItemRow::error("3", "f", ErrorKind::MalformedInput, "missing field"),
        ];
        let agg = aggregate(&rows, &[]);
        assert_eq!(agg.items, 2);
        assert_eq!(agg.overall["content_quality"].count, 2);
        assert!((agg.overall["content_quality"].mean - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_skipped_style_still_counts_for_content() {
        let rows = vec![
            ok_row("1", Some("formal"), 0.5, Some(0.8)),
            ok_row("2", Some("X"), 0.9, None),
        ];
        let agg = aggregate(&rows, &[]);
        assert_eq!(agg.overall["content_quality"].count, 2);
        assert_eq!(agg.overall["style_similarity"].count, 1);
        assert!(!agg.by_persona["X"].contains_key("style_similarity"));
        assert_eq!(agg.by_persona["X"]["content_quality"].count, 1);
    }

    #[test]
    fn test_metric_failure_rows_excluded_from_content_only() {
        let full = ok_row("1", Some("formal"), 0.8, Some(0.7));
        let mut partial = ok_row("2", Some("formal"), 0.1, Some(0.5));
        partial.overall_quality = Some(0.2);
        partial.compression_ratio = Some(0.3);
        partial.metric_failures.push(MetricFailure::new(
            "embedding_similarity",
            "no precomputed score on record",
        ));
        let agg = aggregate(&[full, partial], &[]);
        assert_eq!(agg.items, 2);
        assert_eq!(agg.overall["content_quality"].count, 1);
        assert_eq!(agg.overall["content_quality"].mean, 0.8);
        assert!(!agg.overall.contains_key("overall_quality"));
        assert_eq!(agg.overall["style_similarity"].count, 2);
        assert_eq!(agg.overall["compression_ratio"].count, 1);
        assert_eq!(agg.by_persona["formal"]["content_quality"].count, 1);
    }

    #[test]
    fn test_group_by_metadata_and_none_key() {
        let mut a = ok_row("1", None, 0.5, None);
        a.metadata.insert("sector".into(), json!("energy"));
        let b = ok_row("2", None, 0.7, None);
        let agg = aggregate(&[a, b], &["sector".to_string()]);
        let sectors = &agg.by_group["sector"];
        assert_eq!(sectors.keys().collect::<Vec<_>>(), vec!["(none)", "energy"]);
        assert_eq!(agg.by_persona.keys().collect::<Vec<_>>(), vec!["(none)"]);
    }
}
