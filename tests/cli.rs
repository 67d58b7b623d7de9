//! CLI integration tests driving the compiled `distill` binary.
//!
//! Only surfaces that need no summarization backend are exercised here:
//! `jobs`, `cleanup`, and the empty-document short circuit. The pipeline
//! properties themselves are covered in `tests/pipeline.rs`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn distill_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("distill");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[chunking]
min_chars = 100
max_chars = 200
overlap_chars = 20

[summary]
model = "gpt-4o-mini"
target_length = 200

[checkpoints]
dir = "{}/checkpoints"
retention_days = 7
"#,
        root.display()
    );

    let config_path = root.join("distill.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_distill(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = distill_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("OPENAI_API_KEY", "test-key-unused")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run distill binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn seed_checkpoint(dir: &Path, task_id: &str, completed: usize, total: usize, updated_at: &str) {
    fs::create_dir_all(dir).unwrap();
    let json = format!(
        r#"{{
  "task_id": "{task_id}",
  "created_at": "{updated_at}",
  "updated_at": "{updated_at}",
  "progress": {{ "completed_chunks": {completed}, "total_chunks": {total} }},
  "chunk_summaries": [],
  "cumulative_token_usage": {{ "prompt": 0, "completion": 0, "total": 0 }},
  "metadata": {{
    "source_name": "seeded.txt",
    "original_length": 1000,
    "target_summary_length": 200,
    "chunk_config": {{ "min_chars": 100, "max_chars": 200, "overlap_chars": 20 }}
  }}
}}"#
    );
    fs::write(dir.join(format!("{task_id}.json")), json).unwrap();
}

fn checkpoint_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().join("checkpoints")
}

#[test]
fn test_jobs_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_distill(&config_path, &["jobs"]);
    assert!(success, "jobs failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("no pending jobs"));
}

#[test]
fn test_jobs_lists_pending_checkpoint() {
    let (_tmp, config_path) = setup_test_env();
    seed_checkpoint(
        &checkpoint_dir(&config_path),
        "cafe012345678901",
        2,
        5,
        "2026-08-20T10:00:00Z",
    );

    let (stdout, _, success) = run_distill(&config_path, &["jobs"]);
    assert!(success);
    assert!(stdout.contains("cafe012345678901"));
    assert!(stdout.contains("2 / 5 chunks"));
    assert!(stdout.contains("seeded.txt"));
}

#[test]
fn test_jobs_skips_corrupt_checkpoint() {
    let (_tmp, config_path) = setup_test_env();
    let dir = checkpoint_dir(&config_path);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("deadbeef00000000.json"), "{ not json").unwrap();

    let (stdout, _, success) = run_distill(&config_path, &["jobs"]);
    assert!(success);
    assert!(stdout.contains("no pending jobs"));
}

#[test]
fn test_cleanup_removes_stale_keeps_fresh() {
    let (_tmp, config_path) = setup_test_env();
    let dir = checkpoint_dir(&config_path);

    seed_checkpoint(&dir, "aaaa000000000000", 1, 4, "2020-01-01T00:00:00Z");
    let fresh = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    seed_checkpoint(&dir, "bbbb000000000000", 1, 4, &fresh);

    let (stdout, _, success) = run_distill(&config_path, &["cleanup"]);
    assert!(success);
    assert!(stdout.contains("removed 1 checkpoint(s)"));
    assert!(!dir.join("aaaa000000000000.json").exists());
    assert!(dir.join("bbbb000000000000.json").exists());
}

#[test]
fn test_cleanup_override_window() {
    let (_tmp, config_path) = setup_test_env();
    let dir = checkpoint_dir(&config_path);
    let two_days_ago = (chrono::Utc::now() - chrono::Duration::days(2))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();
    seed_checkpoint(&dir, "cccc000000000000", 1, 4, &two_days_ago);

    // Within the default 7-day window, so the default keeps it...
    let (stdout, _, success) = run_distill(&config_path, &["cleanup"]);
    assert!(success);
    assert!(stdout.contains("removed 0 checkpoint(s)"));
    assert!(dir.join("cccc000000000000.json").exists());

    // ...but an explicit zero-day window removes it.
    let (stdout, _, success) = run_distill(&config_path, &["cleanup", "--older-than-days", "0"]);
    assert!(success);
    assert!(stdout.contains("removed 1 checkpoint(s)"));
    assert!(!dir.join("cccc000000000000.json").exists());
}

#[test]
fn test_summarize_empty_document_short_circuits() {
    let (tmp, config_path) = setup_test_env();
    let doc = tmp.path().join("empty.txt");
    fs::write(&doc, "").unwrap();

    // No summarization call is made for an empty document, so the dummy
    // API key is never used.
    let (stdout, stderr, success) =
        run_distill(&config_path, &["summarize", doc.to_str().unwrap()]);
    assert!(
        success,
        "summarize failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stderr.contains("chunks: 0"));
    assert!(!checkpoint_dir(&config_path).exists());
}
