//! Persisted persona centroids.
//!
//! The cache file is a JSON object `{persona_id: [f64; 10]}`. Entries are
//! validated on load; an entry with the wrong shape is dropped and recorded in
//! the [`LoadReport`] so the next [`CentroidStore::prepare`] rebuilds it.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::sources::{read_samples, PersonaSources};
use super::build_centroid;
use crate::error::{BuildError, CacheError};
use crate::features::{StyleFeatureVector, VectorShapeError, FEATURE_DIM};

/// Serialises cache writes within the process.
static PERSIST_LOCK: Mutex<()> = Mutex::new(());

/// Entries rejected while loading the cache file.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub rejected: Vec<CacheError>,
}

impl LoadReport {
    /// Persona ids whose cached entry was rejected.
    pub fn rejected_personas(&self) -> BTreeSet<String> {
        self.rejected
            .iter()
            .filter_map(|e| match e {
                CacheError::DimensionMismatch { persona, .. }
                | CacheError::InvalidValue { persona, .. } => Some(persona.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn dimension_mismatches(&self) -> usize {
        self.rejected
            .iter()
            .filter(|e| matches!(e, CacheError::DimensionMismatch { .. }))
            .count()
    }
}

/// What the centroid barrier did for each persona.
#[derive(Debug, Default)]
pub struct PrepareReport {
    pub reused: Vec<String>,
    pub built: Vec<String>,
    pub rebuilt_after_mismatch: Vec<String>,
    pub empty_corpus: Vec<String>,
    pub missing_source: Vec<String>,
    pub read_failures: Vec<BuildError>,
}

impl PrepareReport {
    /// True when at least one centroid was built and the cache should be written.
    pub fn changed(&self) -> bool {
        !self.built.is_empty()
    }

    /// Personas that will be style-skipped for lack of a centroid.
    pub fn unavailable(&self) -> BTreeSet<&str> {
        self.empty_corpus
            .iter()
            .chain(&self.missing_source)
            .map(String::as_str)
            .chain(self.read_failures.iter().map(BuildError::persona))
            .collect()
    }
}

/// Persona id → centroid. Built before scoring, then shared read-only.
#[derive(Debug, Default, Clone)]
pub struct CentroidStore {
    centroids: BTreeMap<String, StyleFeatureVector>,
    path: Option<PathBuf>,
}

impl CentroidStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// An empty store that [`persist`](Self::persist)s to `path`, ignoring
    /// whatever is there now.
    pub fn empty_at(path: &Path) -> Self {
        Self {
            centroids: BTreeMap::new(),
            path: Some(path.to_path_buf()),
        }
    }

    /// Open the cache at `path`. A missing file gives an empty store bound to
    /// `path`; a file that is not a JSON object is an error.
    pub fn load(path: &Path) -> Result<(Self, LoadReport), CacheError> {
        let mut store = Self::empty_at(path);
        let mut report = LoadReport::default();
        if !path.exists() {
            debug!("no centroid cache at {}", path.display());
            return Ok((store, report));
        }

        let content = fs::read_to_string(path).map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: BTreeMap<String, Value> =
            serde_json::from_str(&content).map_err(|source| CacheError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        for (persona, entry) in raw {
            match parse_entry(&persona, &entry) {
                Ok(vector) => {
                    store.centroids.insert(persona, vector);
                    report.loaded += 1;
                }
                Err(e) => {
                    warn!("{}; it will be rebuilt", e);
                    report.rejected.push(e);
                }
            }
        }
        debug!(
            "loaded {} cached centroids from {} ({} rejected)",
            report.loaded,
            path.display(),
            report.rejected.len()
        );
        Ok((store, report))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, persona: &str) -> Option<&StyleFeatureVector> {
        self.centroids.get(persona)
    }

    pub fn contains(&self, persona: &str) -> bool {
        self.centroids.contains_key(persona)
    }

    pub fn insert(&mut self, persona: impl Into<String>, centroid: StyleFeatureVector) {
        self.centroids.insert(persona.into(), centroid);
    }

    pub fn remove(&mut self, persona: &str) -> Option<StyleFeatureVector> {
        self.centroids.remove(persona)
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleFeatureVector)> {
        self.centroids.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Write the store to its path. No-op for an in-memory store.
    pub fn persist(&self) -> Result<(), CacheError> {
        match &self.path {
            Some(path) => self.persist_to(path),
            None => Ok(()),
        }
    }

    /// Atomically replace `path` with the current contents.
    pub fn persist_to(&self, path: &Path) -> Result<(), CacheError> {
        let write_err = |source: std::io::Error| CacheError::Write {
            path: path.to_path_buf(),
            source,
        };
        let content = serde_json::to_string_pretty(&self.centroids)?;

        let _guard = PERSIST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            fs::create_dir_all(&parent).map_err(write_err)?;
        }
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        debug!("wrote {} centroids to {}", self.centroids.len(), path.display());
        Ok(())
    }

    /// Make sure every persona in `required ∪ sources` has a centroid.
    ///
    /// Cached entries are reused unless `force_rebuild` is set. Personas that
    /// cannot be built are reported and left without a centroid; their items
    /// are style-skipped.
    pub fn prepare(
        &mut self,
        sources: &PersonaSources,
        required: &BTreeSet<String>,
        force_rebuild: bool,
        load: &LoadReport,
    ) -> PrepareReport {
        let mut report = PrepareReport::default();
        let mismatched = load.rejected_personas();
        let wanted: BTreeSet<&str> = required
            .iter()
            .map(String::as_str)
            .chain(sources.ids())
            .collect();

        for persona in wanted {
            if !force_rebuild && self.contains(persona) {
                report.reused.push(persona.to_string());
                continue;
            }
            let Some(path) = sources.path(persona) else {
                if self.contains(persona) {
                    // forced rebuild without a corpus: keep the cached centroid
                    warn!("no corpus for persona '{}'; keeping cached centroid", persona);
                    report.reused.push(persona.to_string());
                } else {
                    warn!("no corpus configured for persona '{}'; its items will be style-skipped", persona);
                    report.missing_source.push(persona.to_string());
                }
                continue;
            };

            let built = read_samples(persona, path).and_then(|samples| build_centroid(persona, &samples[..]));
            match built {
                Ok(centroid) => {
                    self.insert(persona, centroid);
                    if mismatched.contains(persona) {
                        report.rebuilt_after_mismatch.push(persona.to_string());
                    }
                    report.built.push(persona.to_string());
                }
                Err(BuildError::EmptyPersonaCorpus { persona }) => {
                    warn!("persona '{}' has an empty corpus; its items will be style-skipped", persona);
                    self.remove(&persona);
                    report.empty_corpus.push(persona);
                }
                Err(e) => {
                    warn!("{}", e);
                    self.remove(persona);
                    report.read_failures.push(e);
                }
            }
        }

        info!(
            "centroids ready: {} reused, {} built, {} unavailable",
            report.reused.len(),
            report.built.len(),
            report.unavailable().len()
        );
        report
    }
}

fn parse_entry(persona: &str, entry: &Value) -> Result<StyleFeatureVector, CacheError> {
    let Some(values) = entry.as_array() else {
        return Err(CacheError::NotAnArray {
            persona: persona.to_string(),
        });
    };
    if values.len() != FEATURE_DIM {
        return Err(CacheError::DimensionMismatch {
            persona: persona.to_string(),
            expected: FEATURE_DIM,
            found: values.len(),
        });
    }
    let mut numbers = Vec::with_capacity(FEATURE_DIM);
    for (index, value) in values.iter().enumerate() {
        match value.as_f64() {
            Some(v) => numbers.push(v),
            None => {
                return Err(CacheError::InvalidValue {
                    persona: persona.to_string(),
                    index,
                    value: f64::NAN,
                })
            }
        }
    }
    StyleFeatureVector::from_slice(&numbers).map_err(|e| match e {
        VectorShapeError::WrongDimension { found } => CacheError::DimensionMismatch {
            persona: persona.to_string(),
            expected: FEATURE_DIM,
            found,
        },
        VectorShapeError::InvalidValue { index, value } => CacheError::InvalidValue {
            persona: persona.to_string(),
            index,
            value,
        },
    })
}
