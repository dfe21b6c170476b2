//! `stylefit features` and `stylefit similarity`: look at one text.

use anyhow::{Context, Result};
use serde_json::json;
use std::collections::BTreeSet;

use stylefit_core::features::{extract_features, StyleFeatureVector};
use stylefit_core::style::{score_candidate, StyleOutcome};
use tracing::warn;

use crate::context::{open_store, persona_sources, RunOverrides};

fn feature_lines(v: &StyleFeatureVector) -> String {
    let width = v.named().map(|(n, _)| n.len()).max().unwrap_or(0);
    v.named()
        .map(|(name, value)| format!("{:<width$}  {:.4}\n", name, value, width = width))
        .collect()
}

/// `stylefit features`
pub fn cmd_features(text: &str, as_json: bool) -> Result<StyleFeatureVector> {
    let v = extract_features(text);
    if as_json {
        let named: serde_json::Map<String, serde_json::Value> =
            v.named().map(|(n, x)| (n.to_string(), json!(x))).collect();
        println!("{}", serde_json::to_string_pretty(&named)?);
    } else {
        print!("{}", feature_lines(&v));
    }
    Ok(v)
}

/// `stylefit similarity`
///
/// Builds the persona's centroid on demand when the cache lacks it.
pub fn cmd_similarity(
    overrides: &RunOverrides,
    persona: &str,
    text: &str,
    as_json: bool,
) -> Result<StyleOutcome> {
    let config = overrides.load_config()?;
    let sources = persona_sources(&config);
    let (mut store, load) = open_store(&config.paths.centroid_cache);
    let required: BTreeSet<String> = [persona.to_string()].into_iter().collect();
    let prepare = store.prepare(&sources, &required, false, &load);
    if prepare.changed() {
        if let Err(e) = store.persist() {
            warn!("centroid cache not written: {}", e);
        }
    }

    let outcome = score_candidate(&store, Some(persona), text, config.divergence_base);
    if as_json {
        let doc = json!({
            "persona_id": persona,
            "style_similarity": outcome.similarity(),
            "style_skipped": outcome.is_skipped(),
            "style_skip_reason": outcome.skip_reason(),
            "style_degenerate": outcome.is_degenerate(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("Failed to encode result")?
        );
    } else {
        match outcome {
            StyleOutcome::Scored {
                similarity,
                degenerate,
            } => {
                println!("{:.4}", similarity);
                if degenerate {
                    eprintln!("⚠ text has no measurable style features; similarity forced to 0");
                }
            }
            StyleOutcome::Skipped(reason) => {
                eprintln!("No centroid for persona '{}' ({})", persona, reason);
            }
        }
    }
    Ok(outcome)
}
