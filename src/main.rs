//! # askdoc CLI
//!
//! ## Usage
//!
//! ```bash
//! askdoc --config ./config/askdoc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdoc build <input>` | Extract, chunk and embed a document into the snapshot |
//! | `askdoc chunk <input>` | Preview chunking without embedding |
//! | `askdoc ask "<question>"` | Answer one question from the snapshot |
//! | `askdoc serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use askdoc::{ask, build_cmd, config, logging, server};

/// askdoc: question answering over a single regulation document.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/askdoc.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "askdoc",
    about = "askdoc: question answering over a single regulation document",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/askdoc.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/askdoc.toml")]
    config: PathBuf,

    /// Log filter, e.g. `debug` or `askdoc=debug`. Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the knowledge snapshot from a document.
    ///
    /// Extracts text (PDF or UTF-8 text), splits it into chunks, embeds
    /// every chunk with the configured provider, and writes the snapshot.
    Build {
        /// Source document (`.pdf` or plain text).
        input: PathBuf,

        /// Snapshot path. Defaults to `[knowledge].path`.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show how a document would be chunked.
    Chunk {
        /// Source document (`.pdf` or plain text).
        input: PathBuf,
    },

    /// Answer a single question.
    Ask {
        /// The question.
        question: String,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves `POST /ask` and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref())?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build { input, output } => {
            build_cmd::run_build(&cfg, &input, output.as_deref()).await?;
        }
        Commands::Chunk { input } => {
            build_cmd::run_chunk_preview(&cfg, &input)?;
        }
        Commands::Ask { question, json } => {
            ask::run_ask(&cfg, &question, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
