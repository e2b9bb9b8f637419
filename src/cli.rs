//! CLI glue: argument parsing and the `run` entrypoint shared by `main` and the tests.
//!
//! All pipeline logic lives in [`crate::synchronise`]; this module only loads config,
//! builds the reqwest-backed collaborators and reports the result.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::detect::HttpBaseline;
use crate::load_config::{github_token, load_config};
use crate::provider::GithubClient;
use crate::synchronise::{synchronise, Outcome};

/// CLI for docs-bucket: flatten a remote documentation tree and detect changes.
#[derive(Parser)]
#[clap(
    name = "docs-bucket",
    version,
    about = "Flatten a repository's documentation into one text artifact and report whether it changed"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect, merge and compare the documentation tree described by the config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Override the artifact path from the config file
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<Outcome> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, output } => {
            let mut config = load_config(config)?;
            if let Some(output) = output {
                tracing::info!(artifact = %output.display(), "Artifact path overridden on command line");
                config.output.artifact = output;
            }
            tracing::info!(command = "sync", "Starting synchronisation process");

            let provider = GithubClient::new(config.github_source(), github_token(), config.timeout())?;
            let baseline = HttpBaseline::new(config.baseline.url.clone(), config.timeout())?;

            println!("Synchronise starting...");
            match synchronise(&config.synchronise_config(), &provider, &baseline).await {
                Ok(report) => {
                    println!("Synchronise complete.\nReport:");
                    println!("{:#?}", report);
                    // The artifact is already in place; a missing report does not fail the run.
                    if let Some(report_path) = &config.output.report {
                        if let Err(e) = report.write_json(report_path) {
                            eprintln!("[WARN] Could not write sync report: {}", e);
                            tracing::warn!(command = "sync", error = %e, "Could not write sync report");
                        }
                    }
                    tracing::info!(command = "sync", outcome = ?report.outcome, "Synchronisation complete");
                    Ok(report.outcome)
                }
                Err(e) => {
                    eprintln!("[ERROR] Synchronisation failed: {}", e);
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(e.into())
                }
            }
        }
    }
}
