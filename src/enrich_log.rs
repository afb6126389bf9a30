//! Invocation log for `enrich` and `describe` runs.
//!
//! Entries are appended to a JSONL file, one object per line:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"kind":"enrich","duration_ms":820,"outcome":"success",...}
//! {"schema_version":1,"ts":1707900060000,"kind":"describe","duration_ms":15,"outcome":"failed","failure_kind":"model_not_ready",...}
//! ```
//!
//! Reading tolerates corrupt lines so a torn write never hides the history.
use crate::error::{EnrichError, FailureKind};
use crate::types::BarcodePayload;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::{Duration, Instant};

pub const ENRICH_LOG_SCHEMA_VERSION: u32 = 1;
const CONTENT_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    /// Combined tags + description.
    Enrich,
    /// Description only.
    Describe,
}

impl std::fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enrich => write!(f, "enrich"),
            Self::Describe => write!(f, "describe"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichLogEntry {
    pub schema_version: u32,

    /// Unix timestamp in milliseconds when the entry was finished.
    pub ts: u64,

    pub kind: InvocationKind,

    pub duration_ms: u64,

    /// Semantic type label of the payload, if the caller gave one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload_kind: Option<String>,

    pub outcome: Outcome,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure_kind: Option<FailureKind>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag_count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,

    /// First characters of the payload.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_preview: Option<String>,
}

/// Times one invocation and turns its outcome into an [`EnrichLogEntry`].
pub struct EnrichLogBuilder {
    start: Instant,
    kind: InvocationKind,
    payload_kind: Option<String>,
    content_preview: Option<String>,
}

impl EnrichLogBuilder {
    pub fn new(kind: InvocationKind) -> Self {
        Self {
            start: Instant::now(),
            kind,
            payload_kind: None,
            content_preview: None,
        }
    }

    pub fn with_payload(mut self, payload: &BarcodePayload) -> Self {
        self.payload_kind = payload.kind.clone();
        let preview: String = payload.content.chars().take(CONTENT_PREVIEW_CHARS).collect();
        self.content_preview = Some(if payload.content.chars().count() > CONTENT_PREVIEW_CHARS {
            format!("{preview}...")
        } else {
            preview
        });
        self
    }

    pub fn success(self, tag_count: Option<usize>, summary: impl Into<String>) -> EnrichLogEntry {
        self.build(Outcome::Success, None, tag_count, Some(summary.into()), None)
    }

    pub fn failed(self, err: &EnrichError) -> EnrichLogEntry {
        self.build(
            Outcome::Failed,
            Some(err.kind()),
            None,
            None,
            Some(format!("{err:#}")),
        )
    }

    fn build(
        self,
        outcome: Outcome,
        failure_kind: Option<FailureKind>,
        tag_count: Option<usize>,
        summary: Option<String>,
        error: Option<String>,
    ) -> EnrichLogEntry {
        EnrichLogEntry {
            schema_version: ENRICH_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            kind: self.kind,
            duration_ms: u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX),
            payload_kind: self.payload_kind,
            outcome,
            failure_kind,
            tag_count,
            summary,
            error,
            content_preview: self.content_preview,
        }
    }
}

/// Append one entry, creating the file and its directory if needed.
pub fn append_enrich_log(log_path: &Path, entry: &EnrichLogEntry) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("create directory for enrich log")?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open enrich log for append: {}", log_path.display()))?;

    let line = serde_json::to_string(entry).context("serialize enrich log entry")?;
    writeln!(file, "{line}").context("write enrich log entry")?;
    Ok(())
}

/// Load every readable entry. A missing file is an empty history.
pub fn load_enrich_log(log_path: &Path) -> Result<Vec<EnrichLogEntry>> {
    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(log_path)
        .with_context(|| format!("open enrich log: {}", log_path.display()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {} of enrich log", line_num + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EnrichLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line = line_num + 1, error = %err, "skip corrupt enrich log entry");
            }
        }
    }
    Ok(entries)
}

fn now_epoch_ms() -> u64 {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
