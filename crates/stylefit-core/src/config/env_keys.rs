//! Environment variable names and aliases.
//!
//! The primary name is always `STYLEFIT_*`; aliases are checked in order after it.

pub const STYLEFIT_CONFIG: &str = "STYLEFIT_CONFIG";

/// Input, output and persona locations
pub mod paths {
    pub const STYLEFIT_DATA_DIR: &str = "STYLEFIT_DATA_DIR";
    pub const DATA_DIR_ALIASES: &[&str] = &["EVAL_DATA_DIR"];

    pub const STYLEFIT_OUTPUT_DIR: &str = "STYLEFIT_OUTPUT_DIR";
    pub const OUTPUT_DIR_ALIASES: &[&str] = &["EVAL_OUTPUT_DIR"];

    pub const STYLEFIT_CENTROID_CACHE: &str = "STYLEFIT_CENTROID_CACHE";
    pub const CENTROID_CACHE_ALIASES: &[&str] = &[];

    pub const STYLEFIT_PERSONA_DIR: &str = "STYLEFIT_PERSONA_DIR";
    pub const PERSONA_DIR_ALIASES: &[&str] = &["PERSONA_DIR"];
}

/// Scoring parallelism
pub mod runtime {
    /// 0 = rayon default (one worker per core)
    pub const STYLEFIT_WORKERS: &str = "STYLEFIT_WORKERS";
    pub const WORKERS_ALIASES: &[&str] = &["RAYON_NUM_THREADS"];
}

/// Logging
pub mod observability {
    pub const STYLEFIT_QUIET: &str = "STYLEFIT_QUIET";
    pub const QUIET_ALIASES: &[&str] = &[];

    pub const STYLEFIT_LOG_LEVEL: &str = "STYLEFIT_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &[];

    pub const STYLEFIT_LOG_JSON: &str = "STYLEFIT_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &[];
}
