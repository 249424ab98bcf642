//! # DocuSense CLI (`docsense`)
//!
//! ## Usage
//!
//! ```bash
//! docsense --config ./config/docsense.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsense serve` | Start the HTTP API |
//! | `docsense extract <file>` | Print the text extracted from a document |
//! | `docsense summarize <file>` | Summarize a document |
//! | `docsense ask <file> "<question>"` | Ask one question |
//! | `docsense chat <file>` | Interactive Q&A with history |
//! | `docsense challenge <file>` | Generate comprehension questions |
//! | `docsense evaluate <file> -q Q -a A` | Grade an answer to a question |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `docusense=info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use docusense::commands;
use docusense::config::{self, Config};
use docusense::llm::create_model;
use docusense::server;

/// DocuSense: summaries, Q&A, and comprehension challenges for your documents.
#[derive(Parser)]
#[command(
    name = "docsense",
    about = "DocuSense: understand documents with summaries, Q&A, and challenge questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, built-in defaults are used and the
    /// model provider is disabled.
    #[arg(long, global = true, default_value = "./config/docsense.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind` unless `--bind` is given.
    Serve {
        /// Override the bind address.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print the text extracted from a document.
    Extract {
        /// Path to a .txt, .md, or .pdf file.
        file: PathBuf,
    },

    /// Summarize a document in about 150 words.
    Summarize { file: PathBuf },

    /// Ask a single question about a document.
    Ask {
        file: PathBuf,
        question: String,
    },

    /// Interactive Q&A with conversation history.
    Chat { file: PathBuf },

    /// Generate three comprehension questions.
    Challenge {
        file: PathBuf,

        /// Answer each question on stdin and get it graded.
        #[arg(long)]
        interactive: bool,
    },

    /// Grade an answer to a question about a document.
    Evaluate {
        file: PathBuf,

        #[arg(short, long)]
        question: String,

        #[arg(short, long)]
        answer: String,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docusense=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config not found, using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut cfg = load(&cli.config)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Extract { file } => {
            commands::run_extract(&file, &cfg)?;
        }
        Commands::Summarize { file } => {
            let model = create_model(&cfg.model)?;
            commands::run_summarize(model.as_ref(), &file, &cfg).await?;
        }
        Commands::Ask { file, question } => {
            let model = create_model(&cfg.model)?;
            commands::run_ask(model.as_ref(), &file, &question, &cfg).await?;
        }
        Commands::Chat { file } => {
            let model = create_model(&cfg.model)?;
            let doc = commands::load_document(&file, &cfg)?;
            let stdin = BufReader::new(tokio::io::stdin());
            commands::chat_loop(
                model.as_ref(),
                &doc,
                cfg.chat.max_history,
                stdin,
                &mut std::io::stdout(),
            )
            .await?;
        }
        Commands::Challenge { file, interactive } => {
            let model = create_model(&cfg.model)?;
            let doc = commands::load_document(&file, &cfg)?;
            let stdin = BufReader::new(tokio::io::stdin());
            commands::challenge_loop(
                model.as_ref(),
                &doc,
                interactive,
                stdin,
                &mut std::io::stdout(),
            )
            .await?;
        }
        Commands::Evaluate {
            file,
            question,
            answer,
        } => {
            let model = create_model(&cfg.model)?;
            commands::run_evaluate(model.as_ref(), &file, &question, &answer, &cfg).await?;
        }
    }

    Ok(())
}
