use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::summarizer::known_template;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub checkpoints: CheckpointConfig,
}

/// Chunk boundary parameters. Every field participates in task identity —
/// changing any of them makes a resumed checkpoint index-incompatible,
/// so it must produce a new task id.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_min_chars() -> usize {
    2000
}
fn default_max_chars() -> usize {
    3000
}
fn default_overlap_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummaryConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Requested length of the final merged summary, in words.
    #[serde(default = "default_target_length")]
    pub target_length: usize,
    /// Named prompt template (`concise`, `detailed`, `bullets`).
    #[serde(default = "default_template")]
    pub prompt_template: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            target_length: default_target_length(),
            prompt_template: default_template(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_target_length() -> usize {
    500
}
fn default_template() -> String {
    "concise".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_dir")]
    pub dir: PathBuf,
    /// Checkpoints whose `updated_at` is older than this are eligible
    /// for cleanup regardless of completion state.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            dir: default_checkpoint_dir(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("./data/checkpoints")
}
fn default_retention_days() -> u64 {
    7
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if present, otherwise fall back to defaults.
/// Used by the CLI so `distill summarize` works without a config file.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        let config = Config {
            chunking: ChunkingConfig::default(),
            summary: SummaryConfig::default(),
            checkpoints: CheckpointConfig::default(),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.min_chars > config.chunking.max_chars {
        anyhow::bail!(
            "chunking.min_chars ({}) must not exceed chunking.max_chars ({})",
            config.chunking.min_chars,
            config.chunking.max_chars
        );
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunking.max_chars");
    }

    if config.summary.target_length == 0 {
        anyhow::bail!("summary.target_length must be > 0");
    }
    if !known_template(&config.summary.prompt_template) {
        anyhow::bail!(
            "Unknown prompt template: '{}'. Must be concise, detailed, or bullets.",
            config.summary.prompt_template
        );
    }

    if config.checkpoints.retention_days == 0 {
        anyhow::bail!("checkpoints.retention_days must be > 0");
    }

    Ok(())
}
