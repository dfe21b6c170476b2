//! `stylefit centroids build` / `stylefit centroids show`.

use anyhow::{Context, Result};
use serde_json::json;
use std::collections::BTreeSet;

use stylefit_core::centroid::{CentroidStore, PrepareReport};
use stylefit_core::features::FEATURE_NAMES;

use crate::context::{open_store, persona_sources, RunOverrides};

/// `stylefit centroids build`
pub fn cmd_build(overrides: &RunOverrides, force_rebuild: bool) -> Result<PrepareReport> {
    let config = overrides.load_config()?;
    let sources = persona_sources(&config);
    if sources.is_empty() {
        eprintln!(
            "No persona corpora found (persona_dir: {})",
            config
                .persona_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }

    let cache = &config.paths.centroid_cache;
    let (mut store, load) = open_store(cache);
    let report = store.prepare(&sources, &BTreeSet::new(), force_rebuild, &load);
    if report.changed() {
        store
            .persist()
            .with_context(|| format!("Failed to write centroid cache {}", cache.display()))?;
    }

    for persona in &report.built {
        eprintln!("  ✓ {} (built)", persona);
    }
    for persona in &report.reused {
        eprintln!("  ✓ {} (cached)", persona);
    }
    for persona in &report.empty_corpus {
        eprintln!("  ✗ {}: empty corpus", persona);
    }
    for e in &report.read_failures {
        eprintln!("  ✗ {}", e);
    }
    eprintln!();
    eprintln!(
        "{} centroid(s) in {} ({} built, {} cached)",
        store.len(),
        cache.display(),
        report.built.len(),
        report.reused.len()
    );
    Ok(report)
}

/// Centroids as text: one block per persona with named feature values.
pub fn render_centroids(store: &CentroidStore) -> String {
    let mut out = String::new();
    let width = FEATURE_NAMES.iter().map(|n| n.len()).max().unwrap_or(0);
    for (persona, centroid) in store.iter() {
        out.push_str(&format!("{}\n", persona));
        for (name, value) in centroid.named() {
            out.push_str(&format!("  {:<width$}  {:.4}\n", name, value, width = width));
        }
    }
    out
}

/// `stylefit centroids show`
pub fn cmd_show(overrides: &RunOverrides, as_json: bool) -> Result<()> {
    let config = overrides.load_config()?;
    let cache = &config.paths.centroid_cache;
    if !cache.exists() {
        eprintln!("No centroid cache at {}", cache.display());
        eprintln!("Build it with: stylefit centroids build");
        return Ok(());
    }
    let (store, load) = CentroidStore::load(cache)
        .with_context(|| format!("Failed to read centroid cache {}", cache.display()))?;
    for e in &load.rejected {
        eprintln!("⚠ {}", e);
    }

    if as_json {
        let centroids: serde_json::Map<String, serde_json::Value> = store
            .iter()
            .map(|(persona, c)| (persona.to_string(), json!(c.as_slice())))
            .collect();
        let doc = json!({ "features": FEATURE_NAMES, "centroids": centroids });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", render_centroids(&store));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use stylefit_core::centroid::build_centroid;

    fn overrides(root: &std::path::Path) -> RunOverrides {
        let config = root.join("stylefit.yaml");
        fs::write(&config, "").unwrap();
        RunOverrides {
            config: Some(config),
            output_dir: Some(root.join("out")),
            persona_dir: Some(root.join("personas")),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_writes_cache_once() {
        let tmp = tempfile::tempdir().unwrap();
        let personas = tmp.path().join("personas");
        fs::create_dir_all(&personas).unwrap();
        fs::write(personas.join("formal.txt"), "The board convened.\n\nThe motion carried.").unwrap();
        fs::write(personas.join("blank.txt"), "").unwrap();
        let o = overrides(tmp.path());

        let first = cmd_build(&o, false).unwrap();
        assert_eq!(first.built, vec!["formal"]);
        assert_eq!(first.empty_corpus, vec!["blank"]);
        let cache: PathBuf = tmp.path().join("out").join("persona_centroids.json");
        let (store, _) = CentroidStore::load(&cache).unwrap();
        assert!(store.contains("formal"));
        assert!(!store.contains("blank"));

        let again = cmd_build(&o, false).unwrap();
        assert!(again.built.is_empty());
        assert_eq!(again.reused, vec!["formal"]);
    }

    #[test]
    fn test_render_centroids_lists_every_feature() {
        let mut store = CentroidStore::in_memory();
        store.insert("formal", build_centroid("formal", &["The board convened."]).unwrap());
        let text = render_centroids(&store);
        assert!(text.starts_with("formal\n"));
        assert_eq!(text.lines().count(), 1 + FEATURE_NAMES.len());
        for name in FEATURE_NAMES {
            assert!(text.contains(name));
        }
    }

    #[test]
    fn test_show_without_cache_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(cmd_show(&overrides(tmp.path()), true).is_ok());
    }
}
