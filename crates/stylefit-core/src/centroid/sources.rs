//! Persona corpus locations.
//!
//! A persona's reference writing is one UTF-8 text file whose samples are
//! separated by blank lines. Sources come from an explicit `personas` map in the
//! config plus every `*.txt` file found in `persona_dir` (id = file stem).
//! Explicit entries win over discovered ones.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::split_samples;
use crate::error::BuildError;

#[derive(Debug, Clone, Default)]
pub struct PersonaSources {
    entries: BTreeMap<String, PathBuf>,
}

impl PersonaSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge discovered `persona_dir` files with explicit entries (explicit wins).
    pub fn from_config(explicit: &BTreeMap<String, PathBuf>, persona_dir: Option<&Path>) -> Self {
        let mut sources = match persona_dir {
            Some(dir) => Self::discover(dir),
            None => Self::new(),
        };
        for (id, path) in explicit {
            sources.insert(id.clone(), path.clone());
        }
        sources
    }

    /// Every `*.txt` file directly inside `dir`. A missing directory yields no sources.
    pub fn discover(dir: &Path) -> Self {
        let mut sources = Self::new();
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                debug!("persona dir {} not readable: {}", dir.display(), e);
                return sources;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                sources.insert(stem.to_string(), path.clone());
            }
        }
        debug!("discovered {} persona corpora in {}", sources.len(), dir.display());
        sources
    }

    pub fn insert(&mut self, persona: String, path: PathBuf) {
        self.entries.insert(persona, path);
    }

    pub fn path(&self, persona: &str) -> Option<&Path> {
        self.entries.get(persona).map(PathBuf::as_path)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read and split the corpus of `persona`. An empty corpus is returned as an
/// empty list; the centroid builder decides that it is an error.
pub fn read_samples(persona: &str, path: &Path) -> Result<Vec<String>, BuildError> {
    let text = fs::read_to_string(path).map_err(|source| BuildError::CorpusRead {
        persona: persona.to_string(),
        path: path.to_path_buf(),
        source,
    })?;
    let samples: Vec<String> = split_samples(&text).into_iter().map(String::from).collect();
    if samples.is_empty() {
        warn!("persona '{}' corpus {} contains no samples", persona, path.display());
    }
    Ok(samples)
}
