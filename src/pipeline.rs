//! Map-reduce job orchestration.
//!
//! Coordinates the full job lifecycle: resolve task identity → load
//! checkpoint → map remaining chunks → reduce → delete checkpoint.
//! Chunks are summarized strictly one at a time; each successful chunk
//! is persisted before the next is attempted, so an interruption at any
//! point loses at most the chunk currently in flight. Distinct task ids
//! share no mutable state and may run concurrently; two runs of the
//! *same* task id must be serialized by the caller.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use crate::checkpoint::{Checkpoint, CheckpointMetadata, ChunkSummary, TokenUsage};
use crate::chunk::{self, Chunk};
use crate::config::Config;
use crate::progress::{JobProgressEvent, JobProgressReporter};
use crate::store::CheckpointStore;
use crate::summarizer::{Summarizer, SummaryOutput};
use crate::task_id;

/// Final outcome of a completed job. Nothing here is persisted — once a
/// job succeeds its checkpoint is gone and the result is the caller's.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub task_id: String,
    pub summary: String,
    pub chunks_processed: usize,
    pub token_usage: TokenUsage,
    pub elapsed: std::time::Duration,
}

/// Run (or resume) a summarization job end to end.
///
/// An empty document short-circuits to an empty result; no checkpoint is
/// ever created for it. Any failure surfaces an error carrying the job's
/// task id, and leaves the checkpoint at its last persisted state so a
/// retry resumes instead of restarting.
pub async fn run_job(
    config: &Config,
    store: &dyn CheckpointStore,
    summarizer: &dyn Summarizer,
    document: &str,
    source_name: &str,
    reporter: &dyn JobProgressReporter,
) -> Result<JobResult> {
    let started = Instant::now();
    let task_id = task_id::resolve(document.as_bytes(), &config.chunking, &config.summary);

    let chunks = chunk::split(document, &config.chunking);
    if chunks.is_empty() {
        return Ok(JobResult {
            task_id,
            summary: String::new(),
            chunks_processed: 0,
            token_usage: TokenUsage::default(),
            elapsed: started.elapsed(),
        });
    }

    let checkpoint = load_checkpoint(config, store, &task_id, &chunks, source_name, document.len())
        .await?;

    let checkpoint = run_map_stage(
        config,
        store,
        summarizer,
        &chunks,
        checkpoint,
        source_name,
        reporter,
    )
    .await?;

    reporter.report(JobProgressEvent::Reducing {
        source: source_name.to_string(),
    });
    let reduced = run_reduce_stage(config, summarizer, &checkpoint)
        .await
        .with_context(|| format!("job {}: reduce failed", task_id))?;

    // Terminal: the job is no longer resumable, so re-submitting the same
    // content starts a brand-new job.
    store
        .delete(&task_id)
        .await
        .with_context(|| format!("job {}: failed to delete checkpoint", task_id))?;

    let mut token_usage = checkpoint.cumulative_token_usage;
    token_usage.add(reduced.usage);

    Ok(JobResult {
        task_id,
        summary: reduced.text,
        chunks_processed: chunks.len(),
        token_usage,
        elapsed: started.elapsed(),
    })
}

/// Load the checkpoint for this task id, or start a fresh one.
///
/// A stored checkpoint whose `total_chunks` disagrees with the freshly
/// computed chunk count is discarded. The identity hash makes that
/// structurally impossible, but index alignment is too important to
/// leave to convention.
async fn load_checkpoint(
    config: &Config,
    store: &dyn CheckpointStore,
    task_id: &str,
    chunks: &[Chunk],
    source_name: &str,
    original_length: usize,
) -> Result<Checkpoint> {
    if let Some(existing) = store.get(task_id).await? {
        if existing.progress.total_chunks == chunks.len() {
            return Ok(existing);
        }
    }

    Ok(Checkpoint::new(
        task_id,
        chunks.len(),
        CheckpointMetadata {
            source_name: source_name.to_string(),
            original_length,
            target_summary_length: config.summary.target_length,
            chunk_config: config.chunking.clone(),
        },
    ))
}

/// Summarize every chunk not yet recorded, persisting after each one.
///
/// The returned checkpoint is fully mapped. The per-chunk `put` is the
/// happens-before edge resumability rests on: a chunk is only marked
/// completed once its summary is durable, and a `put` failure aborts
/// before the next chunk is attempted, so a restart re-attempts exactly
/// the chunk that failed.
async fn run_map_stage(
    config: &Config,
    store: &dyn CheckpointStore,
    summarizer: &dyn Summarizer,
    chunks: &[Chunk],
    mut checkpoint: Checkpoint,
    source_name: &str,
    reporter: &dyn JobProgressReporter,
) -> Result<Checkpoint> {
    let total = chunks.len();

    for chunk in chunks.iter().skip(checkpoint.progress.completed_chunks) {
        reporter.report(JobProgressEvent::Mapping {
            source: source_name.to_string(),
            n: (chunk.index + 1) as u64,
            total: total as u64,
        });

        let output = summarizer
            .summarize_chunk(&chunk.text, &config.summary)
            .await
            .with_context(|| {
                format!(
                    "job {}: chunk {} of {} failed",
                    checkpoint.task_id,
                    chunk.index + 1,
                    total
                )
            })?;

        checkpoint.record_chunk(ChunkSummary {
            chunk_index: chunk.index,
            summary_text: output.text,
            token_usage: output.usage,
        });
        store.put(&checkpoint).await.with_context(|| {
            format!(
                "job {}: failed to persist checkpoint after chunk {}",
                checkpoint.task_id,
                chunk.index + 1
            )
        })?;
    }

    Ok(checkpoint)
}

/// Merge all chunk summaries into the final summary with one call.
async fn run_reduce_stage(
    config: &Config,
    summarizer: &dyn Summarizer,
    checkpoint: &Checkpoint,
) -> Result<SummaryOutput> {
    debug_assert!(checkpoint.is_fully_mapped());

    let summaries: Vec<String> = checkpoint
        .chunk_summaries
        .iter()
        .map(|s| s.summary_text.clone())
        .collect();

    summarizer.merge_summaries(&summaries, &config.summary).await
}

/// Delete checkpoints whose `updated_at` exceeds the retention window,
/// regardless of completion state. Returns the number removed.
pub async fn cleanup(store: &dyn CheckpointStore, older_than: Duration) -> Result<usize> {
    let cutoff = Utc::now() - older_than;
    let stale = store.list_older_than(cutoff).await?;

    for task_id in &stale {
        store.delete(task_id).await?;
    }

    Ok(stale.len())
}

/// All pending (interrupted) checkpoints, for operator inspection.
pub async fn pending_jobs(store: &dyn CheckpointStore) -> Result<Vec<Checkpoint>> {
    let task_ids = store.list_older_than(Utc::now()).await?;

    let mut jobs = Vec::with_capacity(task_ids.len());
    for task_id in &task_ids {
        if let Some(checkpoint) = store.get(task_id).await? {
            jobs.push(checkpoint);
        }
    }

    Ok(jobs)
}
