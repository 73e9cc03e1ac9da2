//! # SkillSync CLI (`skillsync`)
//!
//! ## Usage
//!
//! ```bash
//! skillsync [--config ./config/skillsync.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skillsync serve` | Start the HTTP API server |
//! | `skillsync search "<query>"` | Search the seed dataset from the terminal |
//!
//! ## Examples
//!
//! ```bash
//! # Serve on the port from $PORT (default 5000)
//! PORT=8080 skillsync serve
//!
//! # Only knowledge articles, top 5
//! skillsync search "database connection" --type knowledge --limit 5
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`). A `.env` file in the working directory is loaded first.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use skillsync::{config, search, server};

/// SkillSync: a knowledge-sharing backend with relevance-ranked search and
/// AI-assisted answers.
#[derive(Parser)]
#[command(
    name = "skillsync",
    about = "Knowledge sharing, Q&A and AI answers for project teams",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/skillsync.toml` when that file exists, and to
    /// built-in defaults otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    ///
    /// Binds to `[server].bind` (the port can be overridden with `PORT`)
    /// and serves the JSON API under `/api`.
    Serve,

    /// Search knowledge and queries in the seed dataset.
    Search {
        /// The search query string.
        query: String,

        /// Which collections to search: `all`, `knowledge`, or `queries`.
        #[arg(long = "type", default_value = "all")]
        kind: String,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Search { query, kind, limit } => {
            search::run_search(&cfg, &query, &kind, limit).await?;
        }
    }

    Ok(())
}
