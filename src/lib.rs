//! # Distill
//!
//! A resumable map-reduce summarization pipeline for large documents.
//!
//! Distill splits a document into bounded, sentence-aligned chunks,
//! summarizes each chunk independently via a language-model backend,
//! persists a checkpoint after every chunk, and merges the chunk
//! summaries into one final summary. A job interrupted by a crash,
//! network failure, or Ctrl-C resumes exactly where it left off —
//! completed chunks are never re-summarized, so no tokens are re-spent.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────────┐   ┌────────────┐
//! │ Document │──▶│ Chunker │──▶│  Map stage    │──▶│   Reduce   │
//! └──────────┘   └─────────┘   │ (per chunk)   │   │ (merge)    │
//!                              └──────┬────────┘   └─────┬──────┘
//!                                     │ put per chunk    │ delete
//!                                     ▼                  ▼
//!                              ┌────────────────────────────┐
//!                              │  Checkpoint store (by      │
//!                              │  content-derived task id)  │
//!                              └────────────────────────────┘
//! ```
//!
//! Jobs are identified by a digest of the document bytes plus every
//! configuration field that affects chunk boundaries or summary
//! semantics, so re-submitting the same content under a different
//! filename resumes the same job.
//!
//! ## Quick Start
//!
//! ```bash
//! distill summarize report.txt      # run (or resume) a summarization job
//! distill jobs                      # list interrupted jobs
//! distill cleanup                   # remove checkpoints past retention
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`chunk`] | Sentence-boundary chunking with overlap |
//! | [`task_id`] | Content-addressed task identity |
//! | [`checkpoint`] | Checkpoint and token-usage data model |
//! | [`store`] | Checkpoint persistence backends |
//! | [`summarizer`] | Summarization backend abstraction |
//! | [`pipeline`] | Map/reduce orchestration and cleanup |
//! | [`progress`] | Per-chunk progress reporting |

pub mod checkpoint;
pub mod chunk;
pub mod config;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod summarizer;
pub mod task_id;
