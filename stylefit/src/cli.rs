use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use stylefit_commands::RunOverrides;

/// stylefit - persona summarization evaluation
#[derive(Parser, Debug)]
#[command(name = "stylefit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Only log warnings and errors (same as STYLEFIT_QUIET=1)
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Config file and directory overrides shared by most commands.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// YAML config file (default: $STYLEFIT_CONFIG, ./stylefit.yaml, then the user config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory (default: from config or STYLEFIT_OUTPUT_DIR)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory of persona corpora, one `<persona>.txt` each
    #[arg(long, value_name = "DIR")]
    pub persona_dir: Option<PathBuf>,
}

impl PathArgs {
    pub fn overrides(&self) -> RunOverrides {
        RunOverrides {
            config: self.config.clone(),
            output_dir: self.output_dir.clone(),
            persona_dir: self.persona_dir.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every record: style fidelity, content quality and composites
    Evaluate {
        #[command(flatten)]
        paths: PathArgs,

        /// Record file or directory of *.json / *.jsonl files
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,

        /// CSV with write_id,persona_id columns; overrides the record's persona field
        #[arg(long, value_name = "CSV")]
        assignments: Option<PathBuf>,

        /// Rebuild every persona centroid even when cached
        #[arg(long, default_value = "false")]
        force_rebuild: bool,

        /// Scoring threads (0 = one per core)
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },

    /// Build or inspect the persona centroid cache
    Centroids {
        #[command(subcommand)]
        action: CentroidAction,
    },

    /// Regenerate report.md from the saved rows and aggregates
    Report {
        #[command(flatten)]
        paths: PathArgs,

        /// Report path (default: <output_dir>/report.md)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Print the stylometric feature vector of a text
    Features {
        /// Text to analyse. Use "-" to read from stdin
        #[arg(value_name = "TEXT")]
        text: String,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Style similarity of a text against one persona centroid
    Similarity {
        #[command(flatten)]
        paths: PathArgs,

        /// Persona id
        #[arg(long, value_name = "ID")]
        persona: String,

        /// Text to score. Use "-" to read from stdin
        #[arg(value_name = "TEXT")]
        text: String,

        /// Print JSON instead of a bare score
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CentroidAction {
    /// Build centroids for every configured persona corpus
    Build {
        #[command(flatten)]
        paths: PathArgs,

        /// Rebuild even when a cached centroid exists
        #[arg(long, default_value = "false")]
        force_rebuild: bool,
    },

    /// Show cached centroids
    Show {
        #[command(flatten)]
        paths: PathArgs,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },
}
