//! # Distill CLI (`distill`)
//!
//! Command-line interface for the resumable map-reduce summarization
//! pipeline.
//!
//! ## Usage
//!
//! ```bash
//! distill --config ./config/distill.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `distill summarize <file>` | Run (or resume) a summarization job |
//! | `distill jobs` | List interrupted jobs and their progress |
//! | `distill cleanup` | Remove checkpoints past the retention window |
//!
//! ## Examples
//!
//! ```bash
//! # Summarize a document (resumes automatically after interruption)
//! distill summarize report.txt
//!
//! # See what's pending after an interruption
//! distill jobs
//!
//! # Garbage-collect checkpoints older than the configured retention
//! distill cleanup
//!
//! # Garbage-collect more aggressively
//! distill cleanup --older-than-days 1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use distill::config;
use distill::pipeline;
use distill::progress::ProgressMode;
use distill::store::FileStore;
use distill::summarizer::OpenAiSummarizer;

/// Distill — resumable map-reduce document summarization.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; built-in defaults apply when the file is absent.
#[derive(Parser)]
#[command(
    name = "distill",
    about = "Distill — resumable map-reduce document summarization",
    version,
    long_about = "Distill splits a large document into sentence-aligned chunks, summarizes \
    each chunk via a language model, checkpoints progress after every chunk, and merges the \
    chunk summaries into one final summary. Interrupted jobs resume exactly where they left \
    off without re-spending tokens on completed chunks."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/distill.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Summarize a document, resuming any interrupted job for the same
    /// content and configuration.
    ///
    /// The job's identity is derived from the file's bytes plus the
    /// chunking and summary configuration — not the filename — so a
    /// renamed copy of an interrupted document still resumes.
    Summarize {
        /// Path to the document (plain text).
        file: PathBuf,

        /// Source name recorded in the checkpoint (defaults to the file name).
        #[arg(long)]
        name: Option<String>,

        /// Progress output: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a TTY, otherwise `off`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// List interrupted jobs with their progress.
    ///
    /// Shows each pending checkpoint's task id, completed/total chunks,
    /// source name, and last update time.
    Jobs,

    /// Remove checkpoints older than the retention window.
    ///
    /// Applies regardless of completion state; a fully mapped checkpoint
    /// past retention is removed like any other.
    Cleanup {
        /// Override the retention window from config (days).
        #[arg(long)]
        older_than_days: Option<u64>,
    },
}

fn parse_progress_mode(arg: Option<&str>) -> Result<ProgressMode> {
    match arg {
        None => Ok(ProgressMode::default_for_tty()),
        Some("off") => Ok(ProgressMode::Off),
        Some("human") => Ok(ProgressMode::Human),
        Some("json") => Ok(ProgressMode::Json),
        Some(other) => anyhow::bail!(
            "Unknown progress mode: '{}'. Must be off, human, or json.",
            other
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;
    let store = FileStore::new(cfg.checkpoints.dir.clone());

    match cli.command {
        Commands::Summarize {
            file,
            name,
            progress,
        } => {
            let document = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read document: {}", file.display()))?;
            let source_name = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string())
            });
            let reporter = parse_progress_mode(progress.as_deref())?.reporter();
            let summarizer = OpenAiSummarizer::new(&cfg.summary)?;

            let result = pipeline::run_job(
                &cfg,
                &store,
                &summarizer,
                &document,
                &source_name,
                reporter.as_ref(),
            )
            .await?;

            println!("{}", result.summary);
            eprintln!();
            eprintln!("task: {}", result.task_id);
            eprintln!("chunks: {}", result.chunks_processed);
            eprintln!(
                "tokens: {} prompt + {} completion = {}",
                result.token_usage.prompt, result.token_usage.completion, result.token_usage.total
            );
            eprintln!("elapsed: {:.1}s", result.elapsed.as_secs_f64());
        }
        Commands::Jobs => {
            let jobs = pipeline::pending_jobs(&store).await?;
            if jobs.is_empty() {
                println!("no pending jobs");
            } else {
                for cp in jobs {
                    println!(
                        "{}  {} / {} chunks  {}  updated {}",
                        cp.task_id,
                        cp.progress.completed_chunks,
                        cp.progress.total_chunks,
                        cp.metadata.source_name,
                        cp.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
        }
        Commands::Cleanup { older_than_days } => {
            let days = older_than_days.unwrap_or(cfg.checkpoints.retention_days);
            let removed =
                pipeline::cleanup(&store, chrono::Duration::days(days as i64)).await?;
            println!("removed {} checkpoint(s)", removed);
        }
    }

    Ok(())
}
