//! Content-addressed task identity.
//!
//! A task id is a SHA-256 digest over the document bytes and every
//! configuration field that changes chunk boundaries or summary semantics.
//! Byte-identical uploads under different filenames or at different times
//! resolve to the same id, so an interrupted job resumes across sessions.
//! Changing any identity field yields a new id — resuming a checkpoint
//! built under different chunking parameters would silently misalign
//! chunk indices, so the binding is structural, not conventional.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::{ChunkingConfig, SummaryConfig};

/// Fields hashed into the task id. Field order is fixed by this struct,
/// so the serialized form is canonical.
#[derive(Serialize)]
struct IdentityConfig<'a> {
    min_chars: usize,
    max_chars: usize,
    overlap_chars: usize,
    target_length: usize,
    prompt_template: &'a str,
    model: &'a str,
}

/// Derive the task id for a document and its processing configuration.
///
/// Filenames and timestamps deliberately do not participate.
pub fn resolve(document: &[u8], chunking: &ChunkingConfig, summary: &SummaryConfig) -> String {
    let identity = IdentityConfig {
        min_chars: chunking.min_chars,
        max_chars: chunking.max_chars,
        overlap_chars: chunking.overlap_chars,
        target_length: summary.target_length,
        prompt_template: &summary.prompt_template,
        model: &summary.model,
    };
    // Serialization of a flat struct of scalars cannot fail.
    let config_json = serde_json::to_vec(&identity).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(document);
    hasher.update([0u8]);
    hasher.update(&config_json);
    let digest = format!("{:x}", hasher.finalize());

    digest[..16].to_string()
}
