//! Failure taxonomy for enrichment requests.
//!
//! Every failure crosses the pipeline boundary as an [`EnrichError`]; callers
//! pick the message to show from [`EnrichError::user_message`] and decide on
//! retries from [`EnrichError::is_retryable`].
use crate::model::ModelState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by the enrichment pipeline.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The model can never run on this device.
    #[error("generative model is not supported on this device")]
    DeviceUnsupported,

    /// The model is downloadable or downloading.
    #[error("generative model is not ready yet ({state})")]
    ModelNotReady { state: ModelState },

    /// The model reported a status outside the known lifecycle.
    #[error("generative model status unknown: {reported}")]
    StatusUnknown { reported: String },

    /// No client handle could be obtained.
    #[error("failed to initialize generative model client: {message}")]
    ClientInitFailed { message: String },

    #[error("empty response from model")]
    EmptyModelResponse,

    /// Neither JSON parsing nor comma splitting recovered anything usable.
    #[error("model output could not be parsed: {preview}")]
    MalformedModelOutput { preview: String },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Serializable tag for an [`EnrichError`], used in logs and `--json` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DeviceUnsupported,
    ModelNotReady,
    StatusUnknown,
    ClientInitFailed,
    EmptyModelResponse,
    MalformedModelOutput,
    UnexpectedException,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceUnsupported => write!(f, "device_unsupported"),
            Self::ModelNotReady => write!(f, "model_not_ready"),
            Self::StatusUnknown => write!(f, "status_unknown"),
            Self::ClientInitFailed => write!(f, "client_init_failed"),
            Self::EmptyModelResponse => write!(f, "empty_model_response"),
            Self::MalformedModelOutput => write!(f, "malformed_model_output"),
            Self::UnexpectedException => write!(f, "unexpected_exception"),
        }
    }
}

impl EnrichError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::DeviceUnsupported => FailureKind::DeviceUnsupported,
            Self::ModelNotReady { .. } => FailureKind::ModelNotReady,
            Self::StatusUnknown { .. } => FailureKind::StatusUnknown,
            Self::ClientInitFailed { .. } => FailureKind::ClientInitFailed,
            Self::EmptyModelResponse => FailureKind::EmptyModelResponse,
            Self::MalformedModelOutput { .. } => FailureKind::MalformedModelOutput,
            Self::Unexpected(_) => FailureKind::UnexpectedException,
        }
    }

    /// Whether the same request may succeed if issued again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelNotReady { .. } | Self::StatusUnknown { .. } | Self::ClientInitFailed { .. }
        )
    }

    /// Short message suitable for end users. Never includes cause text.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DeviceUnsupported => "AI features are not available on this device.",
            Self::ModelNotReady {
                state: ModelState::Downloading,
            } => "AI model download in progress. Please try again shortly.",
            Self::ModelNotReady { .. } => {
                "AI model is downloading in background. Please try again in a minute or two."
            }
            Self::StatusUnknown { .. } => {
                "AI model status unknown. AI features may not be available right now."
            }
            Self::ClientInitFailed { .. } => {
                "Unable to initialize AI model. AI features are temporarily unavailable."
            }
            Self::EmptyModelResponse => "The AI model returned an empty answer.",
            Self::MalformedModelOutput { .. } => "The AI model returned an unreadable answer.",
            Self::Unexpected(_) => "Something went wrong while generating AI suggestions.",
        }
    }
}
