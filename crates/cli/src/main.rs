//! Vehicle advisor CLI
//!
//! Queries a running advisor server for range and maintenance predictions,
//! checks its health, and trains or inspects model artifacts offline.

mod client;
mod commands;
mod config;
mod output;

use advisor_lib::{ModelKind, TrainerConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{artifacts, predict, status};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Vehicle advisor CLI
#[derive(Parser)]
#[command(name = "vadv")]
#[command(author, version, about = "CLI for the Vehicle Advisor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (falls back to ~/.config/vadv/config.json)
    #[arg(long, env = "VADV_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict EV driving range and get a charging suggestion
    Range(predict::RangeArgs),

    /// Predict engine failure and project the next maintenance date
    Maintenance(predict::MaintenanceArgs),

    /// Show server health and readiness
    Status,

    /// Train a model on synthetic data and write the artifact
    Train {
        /// Model kind (range, maintenance)
        kind: ModelKind,

        /// Artifact output path
        #[arg(long, short)]
        output: PathBuf,

        /// Number of synthetic samples
        #[arg(long, default_value_t = 10_000)]
        samples: usize,

        /// Number of trees
        #[arg(long, default_value_t = 100)]
        estimators: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Print the kind, schema and metadata of an artifact
    Inspect {
        /// Model kind the artifact must hold (range, maintenance)
        kind: ModelKind,

        /// Artifact path
        path: PathBuf,
    },
}

/// Client for the flag/env URL, else the config file URL, else the default
fn api_client(explicit: Option<String>) -> Result<client::ApiClient> {
    let api_url = config::Config::load()?.resolve_api_url(explicit);
    client::ApiClient::new(&api_url)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Train {
            kind,
            output,
            samples,
            estimators,
            seed,
        } => {
            let config = TrainerConfig {
                n_samples: samples,
                n_estimators: estimators,
                seed,
                ..TrainerConfig::default()
            };
            artifacts::train(kind, output, config, cli.format).await?;
        }
        Commands::Inspect { kind, path } => {
            artifacts::inspect(kind, path, cli.format)?;
        }
        Commands::Range(args) => {
            let client = api_client(cli.api_url)?;
            predict::predict_range(&client, args, cli.format).await?;
        }
        Commands::Maintenance(args) => {
            let client = api_client(cli.api_url)?;
            predict::predict_maintenance(&client, args, cli.format).await?;
        }
        Commands::Status => {
            let client = api_client(cli.api_url)?;
            status::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}
