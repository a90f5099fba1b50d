//! ToolScout CLI - run searches and inspect query plans from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Full search with refinement, printed as JSON
//! toolscout-cli search "free cli for code review" --limit 10
//!
//! # Show the extracted intent and the plan built from it
//! toolscout-cli plan "Cursor alternative but cheaper"
//!
//! # Run a hand-edited plan through one executor pass
//! toolscout-cli execute --plan plan.json --query "terminal git client"
//! ```
//!
//! All commands read the same environment configuration as the server.
//! Logs go to stderr so stdout stays valid JSON.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "toolscout-cli")]
#[command(author, version, about = "ToolScout CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search and print the executor output
    Search {
        /// Free-text query
        query: String,

        /// Maximum number of candidates
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the extracted intent and query plan
    Plan {
        /// Free-text query
        query: String,
    },
    /// Execute a plan file (one pass, no refinement)
    Execute {
        /// Path to a `QueryPlan` JSON file
        #[arg(short, long)]
        plan: PathBuf,

        /// Query text for the reranker (defaults to the plan's first vector text)
        #[arg(short, long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolscout_server=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Search { query, limit } => commands::search::search(&query, limit).await?,
        Commands::Plan { query } => commands::search::plan(&query).await?,
        Commands::Execute { plan, query } => {
            commands::execute::execute(&plan, query.as_deref()).await?;
        }
    }
    Ok(())
}
