//! Environment and config file loading.
//!
//! Fallback chains live here so callers never chain `env::var(..).or_else(..)`
//! themselves.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::env_keys;
use super::schema::EvalConfig;
use crate::error::ConfigError;

const LOCAL_CONFIG_FILE: &str = "stylefit.yaml";

/// Parse `.env` content into key/value pairs. Blank lines and `#` comments are
/// skipped; surrounding quotes and unquoted inline comments are stripped.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim().trim_start_matches("export ").trim();
        let mut value = line[eq_pos + 1..].trim();
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            out.push((key.to_string(), value.to_string()));
        }
    }
    out
}

/// Load `./.env` into the process environment once, without overriding
/// variables that are already set. Call before any worker threads start.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| PathBuf::from(".env"));
        if let Ok(content) = fs::read_to_string(&path) {
            for (key, value) in parse_dotenv(&content) {
                if env::var(&key).is_err() {
                    #[allow(unsafe_code)]
                    unsafe {
                        env::set_var(&key, &value);
                    }
                }
            }
        }
    });
}

/// Read the primary variable or the first set alias, falling back to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Like [`env_or`] but returns `None` when unset; empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// Boolean variable: 0/false/no/off are false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()));
    match v.as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// Config file to use: `explicit`, then `$STYLEFIT_CONFIG`, then
/// `./stylefit.yaml`, then `<config_dir>/stylefit/config.yaml`.
/// `None` means built-in defaults.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Some(p) = env_optional(env_keys::STYLEFIT_CONFIG, &[]) {
        return Some(PathBuf::from(p));
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|d| d.join("stylefit").join("config.yaml"))
        .filter(|p| p.is_file())
}

/// Read a YAML config file. Missing keys take their defaults.
pub fn read_config_file(path: &Path) -> Result<EvalConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(EvalConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `.env`, read the discovered config file (or defaults), apply
/// `STYLEFIT_*` overrides and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<EvalConfig, ConfigError> {
    load_dotenv();
    let mut config = match discover_config_path(explicit) {
        Some(path) => {
            info!("using config {}", path.display());
            read_config_file(&path)?
        }
        None => {
            debug!("no config file found; using defaults");
            EvalConfig::default()
        }
    };
    config.apply_overrides(env_optional)?;
    config.validate()?;
    Ok(config)
}
