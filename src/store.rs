//! Checkpoint persistence backends.
//!
//! The [`CheckpointStore`] trait defines the narrow contract the pipeline
//! needs — get, whole-object put, delete, and list-by-age — enabling
//! pluggable backends. Two implementations ship:
//!
//! - **[`FileStore`]** — one JSON file per task id; `put` writes to a
//!   temporary file and atomically renames it over the target, so a
//!   half-written checkpoint never survives a crash mid-write.
//! - **[`MemoryStore`]** — `HashMap` behind `RwLock`, for tests and
//!   embedders that do not need durability.
//!
//! A checkpoint that fails to deserialize is treated as absent: the job
//! restarts from chunk 0 instead of failing outright. Corrupt files are
//! still eligible for age-based cleanup via their filesystem mtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::checkpoint::Checkpoint;

/// Abstract checkpoint persistence, keyed by task id.
///
/// `put` must be durable before it returns — the map stage relies on a
/// strict happens-before between "chunk N persisted" and "chunk N+1
/// attempted". Implementations must be `Send + Sync`; the pipeline
/// accesses the store per task id and performs no inter-process locking,
/// so callers serialize concurrent runs of the *same* task id themselves.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load a checkpoint. Corruption is reported as `None`, not an error.
    async fn get(&self, task_id: &str) -> Result<Option<Checkpoint>>;

    /// Atomically replace the whole checkpoint object.
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Remove a checkpoint. Removing an absent checkpoint is not an error.
    async fn delete(&self, task_id: &str) -> Result<()>;

    /// Task ids of checkpoints last updated before `cutoff`.
    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;
}

// ============ File Store ============

/// File-per-task-id checkpoint store.
///
/// Checkpoints live under a single directory as `<task_id>.json`. The
/// directory is created on first write.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", task_id))
    }
}

#[async_trait]
impl CheckpointStore for FileStore {
    async fn get(&self, task_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.path_for(task_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read checkpoint: {}", path.display()))
            }
        };

        // Corrupt checkpoint → absent. The job restarts from chunk 0
        // rather than wedging until an operator intervenes.
        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(_) => Ok(None),
        }
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create checkpoint dir: {}", self.dir.display()))?;

        let path = self.path_for(&checkpoint.task_id);
        let tmp = self.dir.join(format!("{}.json.tmp", checkpoint.task_id));
        let json = serde_json::to_vec_pretty(checkpoint)?;

        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write checkpoint: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to commit checkpoint: {}", path.display()))?;

        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        let path = self.path_for(task_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to delete checkpoint: {}", path.display()))
            }
        }
    }

    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list checkpoint dir: {}", self.dir.display())
                })
            }
        };

        let mut stale = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(task_id) = task_id_from_path(&path) else {
                continue;
            };

            let updated_at = match tokio::fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<Checkpoint>(&content) {
                    Ok(checkpoint) => checkpoint.updated_at,
                    // Corrupt file: fall back to mtime so it still ages out.
                    Err(_) => file_mtime(&entry).await.unwrap_or(cutoff),
                },
                Err(_) => continue,
            };

            if updated_at < cutoff {
                stale.push(task_id);
            }
        }

        stale.sort();
        Ok(stale)
    }
}

fn task_id_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

async fn file_mtime(entry: &tokio::fs::DirEntry) -> Option<DateTime<Utc>> {
    let modified = entry.metadata().await.ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

// ============ Memory Store ============

/// In-memory checkpoint store for tests and non-durable embedding.
pub struct MemoryStore {
    checkpoints: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            checkpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Number of checkpoints currently held.
    pub fn len(&self) -> usize {
        self.checkpoints.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn get(&self, task_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoints.read().unwrap().get(task_id).cloned())
    }

    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.checkpoints
            .write()
            .unwrap()
            .insert(checkpoint.task_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        self.checkpoints.write().unwrap().remove(task_id);
        Ok(())
    }

    async fn list_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let mut stale: Vec<String> = self
            .checkpoints
            .read()
            .unwrap()
            .values()
            .filter(|cp| cp.updated_at < cutoff)
            .map(|cp| cp.task_id.clone())
            .collect();
        stale.sort();
        Ok(stale)
    }
}
