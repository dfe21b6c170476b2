//! Record loading and field extraction.
//!
//! Records come from `*.json` files (one object or an array of objects) and
//! `*.jsonl` files (one object per line). A directory is walked recursively in
//! file-name order so item order is stable across runs.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use stylefit_core::config::FieldMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{InputError, ItemError};
use crate::item::{EvaluationItem, ParsedRecord, PrecomputedScores};

/// One record as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Parsed {
        source_file: String,
        index: usize,
        value: Value,
    },
    /// The bytes at this position were not valid JSON.
    Invalid {
        source_file: String,
        index: usize,
        message: String,
    },
}

impl RawRecord {
    pub fn source_file(&self) -> &str {
        match self {
            Self::Parsed { source_file, .. } | Self::Invalid { source_file, .. } => source_file,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Parsed { index, .. } | Self::Invalid { index, .. } => *index,
        }
    }

    /// `<file>#<index>`, used when the record carries no id of its own.
    pub fn positional_id(&self) -> String {
        format!("{}#{}", self.source_file(), self.index())
    }
}

fn is_record_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("jsonl")
    )
}

/// Load every record under `path` (a file or a directory).
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return read_record_file(path);
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|source| InputError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_record_file(entry.path()) {
            records.extend(read_record_file(entry.path())?);
        }
    }
    debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn read_record_file(path: &Path) -> Result<Vec<RawRecord>, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let source_file = path.display().to_string();
    let is_jsonl = path.extension().and_then(|e| e.to_str()) == Some("jsonl");
    Ok(if is_jsonl {
        parse_jsonl(&source_file, &content)
    } else {
        parse_json(&source_file, &content)
    })
}

fn parse_jsonl(source_file: &str, content: &str) -> Vec<RawRecord> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| match serde_json::from_str::<Value>(line) {
            Ok(value) => RawRecord::Parsed {
                source_file: source_file.to_string(),
                index,
                value,
            },
            Err(e) => {
                warn!("{}#{}: invalid JSON: {}", source_file, index, e);
                RawRecord::Invalid {
                    source_file: source_file.to_string(),
                    index,
                    message: e.to_string(),
                }
            }
        })
        .collect()
}

fn parse_json(source_file: &str, content: &str) -> Vec<RawRecord> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(values)) => values
            .into_iter()
            .enumerate()
            .map(|(index, value)| RawRecord::Parsed {
                source_file: source_file.to_string(),
                index,
                value,
            })
            .collect(),
        Ok(value) => vec![RawRecord::Parsed {
            source_file: source_file.to_string(),
            index: 0,
            value,
        }],
        Err(e) => {
            warn!("{}: invalid JSON: {}", source_file, e);
            vec![RawRecord::Invalid {
                source_file: source_file.to_string(),
                index: 0,
                message: e.to_string(),
            }]
        }
    }
}

/// Follow a dotted path (`metadata.author`) through nested objects.
pub fn get_path<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Explicit item id → persona id table, loaded from a `write_id,persona_id` CSV.
#[derive(Debug, Clone, Default)]
pub struct PersonaAssignments {
    map: HashMap<String, String>,
}

/// Split one CSV line into trimmed cells. Quoted cells may contain commas and
/// `""` escapes; embedded newlines are not supported.
fn csv_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

impl PersonaAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let content = fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&content);
        debug!("{} persona assignments from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse CSV text with a header naming `write_id` and `persona_id`.
    /// Rows with an empty id on either side are ignored.
    pub fn parse(content: &str) -> Self {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let Some(header) = lines.next() else {
            return Self::new();
        };
        let columns = csv_cells(header.trim_start_matches('\u{feff}'));
        let position = |name: &str| columns.iter().position(|c| *c == name);
        let (Some(id_col), Some(persona_col)) = (position("write_id"), position("persona_id"))
        else {
            warn!("persona assignment header lacks write_id/persona_id: {}", header);
            return Self::new();
        };

        let mut map = HashMap::new();
        for line in lines {
            let cells = csv_cells(line);
            let (Some(id), Some(persona)) = (cells.get(id_col), cells.get(persona_col)) else {
                continue;
            };
            if !id.is_empty() && !persona.is_empty() {
                map.insert(id.clone(), persona.clone());
            }
        }
        Self { map }
    }

    pub fn insert(&mut self, item_id: impl Into<String>, persona: impl Into<String>) {
        self.map.insert(item_id.into(), persona.into());
    }

    pub fn get(&self, item_id: &str) -> Option<&str> {
        self.map.get(item_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Settings for turning raw records into items.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    pub fields: &'a FieldMap,
    pub assignments: &'a PersonaAssignments,
    pub learned_quality_raw_range: bool,
}

fn required_text(value: &Value, field: &str) -> Result<String, ItemError> {
    match get_path(value, field) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(ItemError::MalformedInput {
            field: field.to_string(),
        }),
    }
}

fn resolve_item_id(raw: &RawRecord, value: &Value, fields: &FieldMap) -> String {
    std::iter::once(&fields.item_id)
        .chain(&fields.item_id_fallbacks)
        .find_map(|path| get_path(value, path).and_then(id_value))
        .unwrap_or_else(|| raw.positional_id())
}

/// Extract an [`EvaluationItem`] from a raw record.
pub fn extract_item(raw: &RawRecord, opts: &ExtractOptions<'_>) -> ParsedRecord {
    let (source_file, value) = match raw {
        RawRecord::Invalid {
            source_file,
            message,
            ..
        } => {
            return ParsedRecord::Failed {
                item_id: raw.positional_id(),
                source_file: source_file.clone(),
                error: ItemError::InvalidRecord {
                    message: message.clone(),
                },
            }
        }
        RawRecord::Parsed {
            source_file, value, ..
        } => (source_file, value),
    };

    let fields = opts.fields;
    let item_id = resolve_item_id(raw, value, fields);
    let fail = |error: ItemError| ParsedRecord::Failed {
        item_id: item_id.clone(),
        source_file: source_file.clone(),
        error,
    };
    if !value.is_object() {
        return fail(ItemError::InvalidRecord {
            message: "record is not a JSON object".to_string(),
        });
    }

    let texts = required_text(value, &fields.source_text).and_then(|source| {
        let reference = required_text(value, &fields.reference)?;
        let candidate = required_text(value, &fields.candidate)?;
        Ok((source, reference, candidate))
    });
    let (source_text, reference_text, candidate_text) = match texts {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    let persona_id = opts
        .assignments
        .get(&item_id)
        .map(str::to_string)
        .or_else(|| get_path(value, &fields.persona).and_then(id_value));

    let learned_quality = get_path(value, &fields.learned_quality)
        .and_then(Value::as_f64)
        .map(|q| {
            if opts.learned_quality_raw_range {
                (q + 1.0) / 2.0
            } else {
                q
            }
        });
    let precomputed = PrecomputedScores {
        embedding_similarity: get_path(value, &fields.embedding_similarity).and_then(Value::as_f64),
        learned_quality,
    };

    let mut metadata = BTreeMap::new();
    for path in &fields.passthrough {
        if let Some(v) = get_path(value, path) {
            let key = path.rsplit('.').next().unwrap_or(path);
            metadata.insert(key.to_string(), v.clone());
        }
    }

    ParsedRecord::Item(EvaluationItem {
        item_id,
        source_file: source_file.clone(),
        source_text,
        reference_text,
        candidate_text,
        persona_id,
        metadata,
        precomputed,
    })
}
