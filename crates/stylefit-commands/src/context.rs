//! Config resolution shared by every command.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use stylefit_core::centroid::{CentroidStore, LoadReport, PersonaSources};
use stylefit_core::config::{load_config, EvalConfig};
use tracing::warn;

const CACHE_FILE: &str = "persona_centroids.json";

/// CLI flags that override the config file and environment.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub persona_dir: Option<PathBuf>,
    pub assignments: Option<PathBuf>,
    pub workers: Option<usize>,
}

impl RunOverrides {
    /// Load and validate the config, then apply the CLI flags on top.
    pub fn load_config(&self) -> Result<EvalConfig> {
        let mut config = load_config(self.config.as_deref()).context("Invalid configuration")?;
        self.apply(&mut config);
        Ok(config)
    }

    /// Apply the flags to `config`. A cache that still sits in the old output
    /// directory follows a new `--output-dir`.
    pub fn apply(&self, config: &mut EvalConfig) {
        if let Some(dir) = &self.data_dir {
            config.paths.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            if config.paths.centroid_cache == config.paths.output_dir.join(CACHE_FILE) {
                config.paths.centroid_cache = dir.join(CACHE_FILE);
            }
            config.paths.output_dir = dir.clone();
        }
        if let Some(dir) = &self.persona_dir {
            config.persona_dir = Some(dir.clone());
        }
        if let Some(path) = &self.assignments {
            config.paths.persona_assignments = Some(path.clone());
        }
        if let Some(n) = self.workers {
            config.workers = n;
        }
    }
}

pub fn persona_sources(config: &EvalConfig) -> PersonaSources {
    PersonaSources::from_config(&config.personas, config.persona_dir.as_deref())
}

/// Open the centroid cache. An unreadable or corrupt file is replaced by an
/// empty store at the same path; every centroid will be rebuilt.
pub fn open_store(path: &Path) -> (CentroidStore, LoadReport) {
    match CentroidStore::load(path) {
        Ok(opened) => opened,
        Err(e) => {
            warn!("{}; rebuilding every centroid", e);
            (CentroidStore::empty_at(path), LoadReport::default())
        }
    }
}
