//! # Insight CLI (`insight`)
//!
//! The `insight` binary runs the web app and offers command-line access to
//! the same analysis pipeline and stored history.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `insight init` | Create the SQLite database and schema |
//! | `insight serve` | Start the web server |
//! | `insight analyze [TEXT]` | Analyze text (argument, `--file`, or stdin) and store it |
//! | `insight history` | List the most recent analyses |
//! | `insight show <id>` | Print one analysis |
//! | `insight export` | Export every analysis as JSON |
//! | `insight stats` | Row counts per category |

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use insight::{analyze, config, export, history, migrate, server, stats};

/// Insight — summarize texts, extract people and categorize them with a
/// local language model.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "insight",
    about = "Insight — summarize, extract people and categorize texts with a local LLM",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/insight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `analyses` table.
    /// Running it multiple times is safe.
    Init,

    /// Start the web server.
    ///
    /// Binds to `[server].bind` and serves the form, analysis and export
    /// endpoints.
    Serve,

    /// Analyze a text and store the result.
    Analyze {
        /// Text to analyze. Read from `--file` or stdin when omitted.
        text: Option<String>,

        /// Read the text from a file.
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// List the most recent analyses, newest first.
    History {
        /// Number of rows to show (defaults to `analysis.history_limit`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print one stored analysis by id.
    Show {
        /// Analysis id.
        id: i64,
    },

    /// Export all analyses as a JSON array.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show database statistics.
    Stats,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("insight=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read text from stdin")?;
    if buf.trim().is_empty() {
        bail!("no text given: pass it as an argument, with --file, or on stdin");
    }
    Ok(buf)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Analyze { text, file } => {
            let text = read_input(text, file)?;
            analyze::run_analyze(&cfg, &text).await?;
        }
        Commands::History { limit } => {
            history::run_history(&cfg, limit).await?;
        }
        Commands::Show { id } => {
            history::run_show(&cfg, id).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
