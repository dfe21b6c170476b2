//! Tracing initialization.
//!
//! Uses `ObservabilityConfig` for STYLEFIT_QUIET, STYLEFIT_LOG_LEVEL and
//! STYLEFIT_LOG_JSON. `RUST_LOG` still wins when set. A `stylefit` directive
//! also covers the `stylefit_core`, `stylefit_eval` and `stylefit_commands`
//! targets (prefix match).

use stylefit_core::config::ObservabilityConfig;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call at process startup.
/// When STYLEFIT_QUIET=1, or `--quiet` is passed, only WARN and above are logged.
pub fn init_tracing(quiet_flag: bool) {
    let cfg = ObservabilityConfig::from_env();
    let level: String = if cfg.quiet || quiet_flag {
        "stylefit=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // stdout carries command output
    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}
