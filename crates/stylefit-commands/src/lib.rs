//! stylefit CLI commands.
//!
//! Each `cmd_*` function backs one subcommand of the `stylefit` binary and
//! returns `anyhow::Result`. Progress and summaries go to stderr; machine
//! output (`--json`, feature values, similarity) goes to stdout.

pub mod centroids;
pub mod context;
pub mod evaluate;
pub mod inspect;
pub mod output;
pub mod render;
pub mod report;

pub use context::RunOverrides;
