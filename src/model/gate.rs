//! Lifecycle gate: decides from a reported status whether generation may run,
//! and drives the best-effort download warm-up.
use super::{DownloadEvent, GenerativeModel, ModelState, ReportedStatus};
use crate::error::EnrichError;
use futures::StreamExt;
use serde::Serialize;

const BYTES_PER_MB: u64 = 1_000_000;

/// Map a fresh status report to "proceed" or a typed failure.
pub fn admit(status: &ReportedStatus) -> Result<(), EnrichError> {
    match status {
        ReportedStatus::Known(ModelState::Available) => {
            tracing::debug!("model available");
            Ok(())
        }
        ReportedStatus::Known(ModelState::Unavailable) => {
            tracing::warn!("model unavailable on this device");
            Err(EnrichError::DeviceUnsupported)
        }
        ReportedStatus::Known(state @ (ModelState::Downloadable | ModelState::Downloading)) => {
            tracing::info!(%state, "model not ready");
            Err(EnrichError::ModelNotReady { state: *state })
        }
        ReportedStatus::Unrecognized(raw) => {
            tracing::warn!(reported = %raw, "unknown model status");
            Err(EnrichError::StatusUnknown {
                reported: raw.clone(),
            })
        }
    }
}

/// Outcome of a warm-up run. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WarmUp {
    /// Nothing to download in this state.
    Skipped { state: ModelState },
    Completed,
    Failed { message: String },
    /// The progress stream ended without a completion or failure event.
    StreamEnded,
    StatusUnknown { reported: String },
}

impl std::fmt::Display for WarmUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped { state } => write!(f, "nothing to do (model {state})"),
            Self::Completed => write!(f, "model download completed"),
            Self::Failed { message } => write!(f, "model download failed: {message}"),
            Self::StreamEnded => write!(f, "download progress stream ended"),
            Self::StatusUnknown { reported } => write!(f, "model status unknown: {reported}"),
        }
    }
}

/// Download the model when it is downloadable, or follow a download already
/// in progress. Never fails; every problem is logged and summarized.
pub async fn ensure_downloaded(model: &dyn GenerativeModel) -> WarmUp {
    let status = match model.check_status().await {
        Ok(status) => status,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "model status check failed");
            return WarmUp::StatusUnknown {
                reported: format!("{err:#}"),
            };
        }
    };
    tracing::info!(%status, "model status before warm-up");

    match status {
        ReportedStatus::Known(state @ (ModelState::Available | ModelState::Unavailable)) => {
            WarmUp::Skipped { state }
        }
        ReportedStatus::Known(ModelState::Downloadable | ModelState::Downloading) => {
            follow_download(model).await
        }
        ReportedStatus::Unrecognized(raw) => {
            tracing::warn!(reported = %raw, "unknown model status, skipping warm-up");
            WarmUp::StatusUnknown { reported: raw }
        }
    }
}

async fn follow_download(model: &dyn GenerativeModel) -> WarmUp {
    let mut events = match model.download().await {
        Ok(events) => events,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "model download could not start");
            return WarmUp::Failed {
                message: format!("{err:#}"),
            };
        }
    };

    while let Some(event) = events.next().await {
        match event {
            DownloadEvent::Started { total_bytes } => {
                tracing::info!(?total_bytes, "model download started");
            }
            DownloadEvent::Progress { downloaded_bytes } => {
                tracing::debug!(
                    downloaded_mb = downloaded_bytes / BYTES_PER_MB,
                    "model download progress"
                );
            }
            DownloadEvent::Completed => {
                tracing::info!("model download completed");
                return WarmUp::Completed;
            }
            DownloadEvent::Failed { message } => {
                tracing::error!(%message, "model download failed");
                return WarmUp::Failed { message };
            }
        }
    }
    tracing::warn!("model download stream ended without a final event");
    WarmUp::StreamEnded
}
