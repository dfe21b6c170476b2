mod cli;
mod observability;

use anyhow::Result;
use clap::Parser;
use std::io::Read;

use cli::{CentroidAction, Cli, Commands};
use stylefit_commands::{centroids, evaluate, inspect, report};

/// `-` reads the whole of stdin.
fn text_arg(text: String) -> Result<String> {
    if text == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        Ok(s)
    } else {
        Ok(text)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing(cli.quiet);

    match cli.command {
        Commands::Evaluate {
            paths,
            data_dir,
            assignments,
            force_rebuild,
            workers,
        } => {
            let mut overrides = paths.overrides();
            overrides.data_dir = data_dir;
            overrides.assignments = assignments;
            overrides.workers = workers;
            evaluate::cmd_evaluate(&overrides, force_rebuild)?;
        }
        Commands::Centroids { action } => match action {
            CentroidAction::Build {
                paths,
                force_rebuild,
            } => {
                centroids::cmd_build(&paths.overrides(), force_rebuild)?;
            }
            CentroidAction::Show { paths, json } => {
                centroids::cmd_show(&paths.overrides(), json)?;
            }
        },
        Commands::Report { paths, out } => {
            report::cmd_report(&paths.overrides(), out.as_deref())?;
        }
        Commands::Features { text, json } => {
            inspect::cmd_features(&text_arg(text)?, json)?;
        }
        Commands::Similarity {
            paths,
            persona,
            text,
            json,
        } => {
            inspect::cmd_similarity(&paths.overrides(), &persona, &text_arg(text)?, json)?;
        }
    }
    Ok(())
}
