//! Checkpoint data model.
//!
//! A [`Checkpoint`] is the durable, resumable state of one summarization
//! job, keyed by its content-derived task id. It is replaced wholesale on
//! every `put` — never mutated in place on disk — so a crash mid-write can
//! never be misread as valid partial state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;

/// Token accounting for a single call or a whole job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt += other.prompt;
        self.completion += other.completion;
        self.total += other.total;
    }
}

/// Map-stage output for one chunk. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub chunk_index: usize,
    pub summary_text: String,
    pub token_usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Progress {
    pub completed_chunks: usize,
    pub total_chunks: usize,
}

/// Job metadata carried for traceability; none of it participates in
/// task identity beyond what the identity hash already covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source_name: String,
    pub original_length: usize,
    pub target_summary_length: usize,
    pub chunk_config: ChunkingConfig,
}

/// Resumable state of one job.
///
/// Invariant: `chunk_summaries.len() == progress.completed_chunks
/// <= progress.total_chunks`, and summaries are in ascending
/// `chunk_index` order — the order they are concatenated for reduce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub task_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: Progress,
    pub chunk_summaries: Vec<ChunkSummary>,
    pub cumulative_token_usage: TokenUsage,
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    pub fn new(task_id: &str, total_chunks: usize, metadata: CheckpointMetadata) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.to_string(),
            created_at: now,
            updated_at: now,
            progress: Progress {
                completed_chunks: 0,
                total_chunks,
            },
            chunk_summaries: Vec::new(),
            cumulative_token_usage: TokenUsage::default(),
            metadata,
        }
    }

    /// Record one completed chunk: append its summary, advance progress,
    /// and fold its usage into the cumulative total. The caller persists
    /// the checkpoint before attempting the next chunk.
    pub fn record_chunk(&mut self, summary: ChunkSummary) {
        debug_assert_eq!(summary.chunk_index, self.progress.completed_chunks);
        self.cumulative_token_usage.add(summary.token_usage);
        self.chunk_summaries.push(summary);
        self.progress.completed_chunks += 1;
        self.updated_at = Utc::now();
    }

    /// All chunks summarized — the terminal pre-reduce state. A fully
    /// mapped checkpoint must never re-enter the map loop; reduce runs
    /// directly on it.
    pub fn is_fully_mapped(&self) -> bool {
        self.progress.completed_chunks == self.progress.total_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> CheckpointMetadata {
        CheckpointMetadata {
            source_name: "report.txt".to_string(),
            original_length: 9400,
            target_summary_length: 500,
            chunk_config: ChunkingConfig::default(),
        }
    }

    fn usage(prompt: u64, completion: u64) -> TokenUsage {
        TokenUsage {
            prompt,
            completion,
            total: prompt + completion,
        }
    }

    #[test]
    fn test_record_chunk_advances_progress() {
        let mut cp = Checkpoint::new("abc123", 3, metadata());
        assert!(!cp.is_fully_mapped());

        cp.record_chunk(ChunkSummary {
            chunk_index: 0,
            summary_text: "first".to_string(),
            token_usage: usage(10, 5),
        });
        cp.record_chunk(ChunkSummary {
            chunk_index: 1,
            summary_text: "second".to_string(),
            token_usage: usage(20, 7),
        });

        assert_eq!(cp.progress.completed_chunks, 2);
        assert_eq!(cp.chunk_summaries.len(), 2);
        assert_eq!(cp.cumulative_token_usage, usage(30, 12));
        assert!(!cp.is_fully_mapped());

        cp.record_chunk(ChunkSummary {
            chunk_index: 2,
            summary_text: "third".to_string(),
            token_usage: usage(5, 2),
        });
        assert!(cp.is_fully_mapped());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut cp = Checkpoint::new("abc123", 2, metadata());
        cp.record_chunk(ChunkSummary {
            chunk_index: 0,
            summary_text: "first".to_string(),
            token_usage: usage(10, 5),
        });

        let json = serde_json::to_string(&cp).unwrap();
        let restored: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.task_id, "abc123");
        assert_eq!(restored.progress.completed_chunks, 1);
        assert_eq!(restored.progress.total_chunks, 2);
        assert_eq!(restored.chunk_summaries[0].summary_text, "first");
        assert_eq!(restored.cumulative_token_usage, usage(10, 5));
        assert_eq!(restored.metadata.source_name, "report.txt");
    }
}
