//! roundtable CLI — the main entry point.
//!
//! Commands:
//! - `run`      — Hold the conversation, extract the artifact and publish it
//! - `extract`  — Run the artifact extractor over a text file
//! - `onboard`  — Write a default config and persona skeletons

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "roundtable",
    about = "roundtable — role-playing agents that build and publish one HTML artifact",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a conversation and publish the resulting artifact
    Run {
        /// The request; read from stdin when omitted
        #[arg(short, long)]
        prompt: Option<String>,

        /// Config file (defaults to ./roundtable.toml)
        #[arg(short, long, env = "ROUNDTABLE_CONFIG")]
        config: Option<PathBuf>,

        /// Write the conversation as JSON to this path
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Extract but do not write or publish the artifact
        #[arg(long)]
        no_publish: bool,

        /// Approve automatically when the team reports it is ready
        #[arg(short, long, conflicts_with = "no_gate")]
        yes: bool,

        /// Never ask for approval during the conversation
        #[arg(long)]
        no_gate: bool,
    },

    /// Extract an artifact from a text file
    Extract {
        /// File treated as a single participant message
        file: PathBuf,

        /// Minimum artifact length in characters
        #[arg(long, default_value_t = 200)]
        min_chars: usize,
    },

    /// Write a default roundtable.toml and persona files
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            prompt,
            config,
            transcript,
            no_publish,
            yes,
            no_gate,
        } => {
            commands::run::run(commands::run::RunArgs {
                prompt,
                config,
                transcript,
                no_publish,
                yes,
                no_gate,
            })
            .await?
        }
        Commands::Extract { file, min_chars } => commands::extract::run(&file, min_chars).await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
