//! Job progress reporting.
//!
//! Reports observable progress during `distill summarize` so users see
//! which chunk is in flight and how much of the map stage remains.
//! Progress is emitted on **stderr** so stdout remains parseable for
//! scripts.

use std::io::Write;

/// A single progress event for a running job.
#[derive(Clone, Debug)]
pub enum JobProgressEvent {
    /// Map stage: chunk `n` of `total` is about to be summarized.
    Mapping {
        source: String,
        n: u64,
        total: u64,
    },
    /// Reduce stage: merging all chunk summaries.
    Reducing { source: String },
}

/// Reports job progress. Implementations write to stderr (human or JSON).
pub trait JobProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the pipeline.
    fn report(&self, event: JobProgressEvent);
}

/// Human-friendly progress on stderr: "summarize report.txt  mapping  3 / 12 chunks".
pub struct StderrProgress;

impl JobProgressReporter for StderrProgress {
    fn report(&self, event: JobProgressEvent) {
        let line = match &event {
            JobProgressEvent::Mapping { source, n, total } => {
                format!("summarize {}  mapping  {} / {} chunks\n", source, n, total)
            }
            JobProgressEvent::Reducing { source } => {
                format!("summarize {}  reducing...\n", source)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JobProgressReporter for JsonProgress {
    fn report(&self, event: JobProgressEvent) {
        let obj = match &event {
            JobProgressEvent::Mapping { source, n, total } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "mapping",
                "n": n,
                "total": total
            }),
            JobProgressEvent::Reducing { source } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "reducing"
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl JobProgressReporter for NoProgress {
    fn report(&self, _event: JobProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the pipeline.
    pub fn reporter(&self) -> Box<dyn JobProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
