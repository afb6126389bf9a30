//! The external generative model, seen as a capability.
//!
//! The pipeline only needs three things from a model runtime: a status query,
//! a download trigger that reports progress, and text generation. Backends
//! implement [`GenerativeModel`]; the pipeline obtains a handle lazily through
//! a [`ModelConnector`] and reuses it until reset.
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod command;
#[cfg(test)]
pub(crate) mod fake;
pub mod gate;
pub mod ollama;

pub use command::CommandModel;
pub use gate::{admit, ensure_downloaded, WarmUp};
pub use ollama::OllamaModel;

/// Temperature used for every generation request.
pub const GENERATION_TEMPERATURE: f32 = 0.4;
pub const GENERATION_TOP_K: u32 = 20;
pub const GENERATION_CANDIDATES: u32 = 1;
/// Token budget for the combined tags + description request.
pub const ENRICH_MAX_OUTPUT_TOKENS: u32 = 150;
/// Token budget for the description-only request (about 200 characters).
pub const DESCRIBE_MAX_OUTPUT_TOKENS: u32 = 100;

/// Readiness of the model on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// The device can never run the model.
    Unavailable,
    /// The model can be fetched but is not present.
    Downloadable,
    /// A download is in progress.
    Downloading,
    Available,
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "unavailable"),
            Self::Downloadable => write!(f, "downloadable"),
            Self::Downloading => write!(f, "downloading"),
            Self::Available => write!(f, "available"),
        }
    }
}

/// What a backend reported when asked for its status.
///
/// Runtimes may grow states this crate does not know about; those arrive as
/// `Unrecognized` with the raw value so they can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ReportedStatus {
    Known(ModelState),
    Unrecognized(String),
}

impl std::fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(state) => write!(f, "{state}"),
            Self::Unrecognized(raw) => write!(f, "unrecognized ({raw})"),
        }
    }
}

/// Progress reported while a model download runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DownloadEvent {
    Started { total_bytes: Option<u64> },
    Progress { downloaded_bytes: u64 },
    Completed,
    Failed { message: String },
}

/// One generation call: prompt plus sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub temperature: f32,
    pub top_k: u32,
    pub candidate_count: u32,
    pub max_output_tokens: u32,
}

impl GenerateRequest {
    /// Parameters for the combined tags + description request.
    pub fn for_enrichment(prompt: impl Into<String>) -> Self {
        Self::with_budget(prompt, ENRICH_MAX_OUTPUT_TOKENS)
    }

    /// Parameters for the description-only request.
    pub fn for_description(prompt: impl Into<String>) -> Self {
        Self::with_budget(prompt, DESCRIBE_MAX_OUTPUT_TOKENS)
    }

    fn with_budget(prompt: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: GENERATION_TEMPERATURE,
            top_k: GENERATION_TOP_K,
            candidate_count: GENERATION_CANDIDATES,
            max_output_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// A response with a single text candidate.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                text: Some(text.into()),
            }],
        }
    }

    /// Trimmed text of the first candidate, empty when there is none.
    pub fn first_text(&self) -> &str {
        self.candidates
            .first()
            .and_then(|candidate| candidate.text.as_deref())
            .map(str::trim)
            .unwrap_or_default()
    }
}

/// A generative text model runtime.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Query the current lifecycle state.
    async fn check_status(&self) -> Result<ReportedStatus>;

    /// Start (or attach to) a model download and stream its progress.
    async fn download(&self) -> Result<BoxStream<'static, DownloadEvent>>;

    /// Generate candidates for a prompt.
    async fn generate_content(&self, request: GenerateRequest) -> Result<GenerateResponse>;
}

/// Produces model handles. Called lazily, at most once per cached handle.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn GenerativeModel>>;
}

#[async_trait]
impl<F> ModelConnector for F
where
    F: Fn() -> Result<Arc<dyn GenerativeModel>> + Send + Sync,
{
    async fn connect(&self) -> Result<Arc<dyn GenerativeModel>> {
        self()
    }
}

/// Use a plain closure as a connector.
pub fn connect_with<F>(connect: F) -> F
where
    F: Fn() -> Result<Arc<dyn GenerativeModel>> + Send + Sync + 'static,
{
    connect
}
