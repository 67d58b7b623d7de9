//! Summarization backend abstraction and the OpenAI implementation.
//!
//! Defines the [`Summarizer`] trait — the pipeline's only external
//! dependency — and [`OpenAiSummarizer`], which calls the OpenAI chat
//! completions API with retry and backoff. Tests substitute deterministic
//! mock implementations to verify resumability without network access.
//!
//! # Retry Strategy
//!
//! Transient failures retry with exponential backoff; terminal failures
//! surface immediately so the checkpoint stays at its last good state:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! # Token Usage
//!
//! A backend that omits the `usage` block (or reports zeros) is treated
//! as having used zero tokens; missing usage is never an error.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::checkpoint::TokenUsage;
use crate::config::SummaryConfig;

/// One summarization call's output: the text plus the tokens it cost.
#[derive(Debug, Clone)]
pub struct SummaryOutput {
    pub text: String,
    pub usage: TokenUsage,
}

/// A language-model summarization service.
///
/// Both operations are suspension points for the pipeline; everything
/// else in a job is local computation.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Summarize one chunk of a larger document.
    async fn summarize_chunk(&self, text: &str, config: &SummaryConfig) -> Result<SummaryOutput>;

    /// Merge ordered chunk summaries into one final summary bounded by
    /// the configured target length.
    async fn merge_summaries(
        &self,
        summaries: &[String],
        config: &SummaryConfig,
    ) -> Result<SummaryOutput>;
}

// ============ Prompt Templates ============

/// Whether `name` is a registered prompt template. The template id
/// participates in task identity, so config validation rejects unknown
/// names before any job runs under them.
pub fn known_template(name: &str) -> bool {
    matches!(name, "concise" | "detailed" | "bullets")
}

fn chunk_style(config: &SummaryConfig) -> Result<&'static str> {
    match config.prompt_template.as_str() {
        "concise" => Ok("Write a tight, factual summary of the passage."),
        "detailed" => Ok(
            "Write a thorough summary of the passage, preserving key figures, names, and caveats.",
        ),
        "bullets" => Ok("Summarize the passage as short bullet points."),
        other => bail!("Unknown prompt template: {}", other),
    }
}

fn chunk_prompt(config: &SummaryConfig) -> Result<String> {
    Ok(format!(
        "{} The passage is one section of a longer document; cover only what it contains.",
        chunk_style(config)?
    ))
}

fn merge_prompt(config: &SummaryConfig) -> Result<String> {
    Ok(format!(
        "{} You are given numbered summaries of consecutive sections of one document. \
         Merge them into a single coherent summary of at most {} words, \
         keeping the original section order.",
        chunk_style(config)?,
        config.target_length
    ))
}

fn number_summaries(summaries: &[String]) -> String {
    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Section {}:\n{}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ============ OpenAI Summarizer ============

/// Summarizer backed by the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiSummarizer {
    model: String,
    api_key: String,
}

impl OpenAiSummarizer {
    /// Create a new OpenAI summarizer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &SummaryConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
        })
    }

    /// Call the chat completions API with retry/backoff.
    async fn chat(
        &self,
        config: &SummaryConfig,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<SummaryOutput> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_content },
            ],
        });

        let mut last_err = None;

        for attempt in 0..=config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Summarization failed after retries")))
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn summarize_chunk(&self, text: &str, config: &SummaryConfig) -> Result<SummaryOutput> {
        let prompt = chunk_prompt(config)?;
        self.chat(config, &prompt, text).await
    }

    async fn merge_summaries(
        &self,
        summaries: &[String],
        config: &SummaryConfig,
    ) -> Result<SummaryOutput> {
        let prompt = merge_prompt(config)?;
        self.chat(config, &prompt, &number_summaries(summaries)).await
    }
}

/// Parse the chat completions response JSON.
///
/// The first choice's message content is required; the `usage` block is
/// optional and defaults to zero when absent.
fn parse_chat_response(json: &serde_json::Value) -> Result<SummaryOutput> {
    let text = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?
        .trim()
        .to_string();

    let usage_field = |name: &str| -> u64 {
        json.get("usage")
            .and_then(|u| u.get(name))
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    };

    Ok(SummaryOutput {
        text,
        usage: TokenUsage {
            prompt: usage_field("prompt_tokens"),
            completion: usage_field("completion_tokens"),
            total: usage_field("total_tokens"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_templates() {
        assert!(known_template("concise"));
        assert!(known_template("detailed"));
        assert!(known_template("bullets"));
        assert!(!known_template("haiku"));
    }

    #[test]
    fn test_parse_response_with_usage() {
        let json = serde_json::json!({
            "choices": [{ "message": { "content": "  A summary.  " } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160 }
        });
        let out = parse_chat_response(&json).unwrap();
        assert_eq!(out.text, "A summary.");
        assert_eq!(out.usage.prompt, 120);
        assert_eq!(out.usage.completion, 40);
        assert_eq!(out.usage.total, 160);
    }

    #[test]
    fn test_parse_response_missing_usage_is_zero() {
        let json = serde_json::json!({
            "choices": [{ "message": { "content": "A summary." } }]
        });
        let out = parse_chat_response(&json).unwrap();
        assert_eq!(out.usage, TokenUsage::default());
    }

    #[test]
    fn test_parse_response_missing_content_fails() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_chat_response(&json).is_err());
    }

    #[test]
    fn test_merge_input_keeps_section_order() {
        let numbered = number_summaries(&[
            "alpha".to_string(),
            "beta".to_string(),
            "gamma".to_string(),
        ]);
        let a = numbered.find("Section 1:\nalpha").unwrap();
        let b = numbered.find("Section 2:\nbeta").unwrap();
        let c = numbered.find("Section 3:\ngamma").unwrap();
        assert!(a < b && b < c);
    }
}
