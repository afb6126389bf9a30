//! Model backend for a local Ollama server.
//!
//! Status comes from `GET /api/tags`, downloads stream `POST /api/pull`
//! progress lines, and generation goes through `POST /api/generate` with
//! streaming disabled. ureq is blocking, so every call runs on the blocking
//! thread pool.
use super::{
    DownloadEvent, GenerateRequest, GenerateResponse, GenerativeModel, ModelState, ReportedStatus,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, BufReader};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PULL_PROGRESS_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    response: String,
}

/// One NDJSON line of `/api/pull` progress.
#[derive(Debug, Deserialize)]
struct PullLine {
    #[serde(default)]
    status: String,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaModel {
    base_url: Url,
    model: String,
    timeout: Duration,
    pull: Arc<PullSlot>,
}

/// The pull in flight, if any. Every `download` call while it runs
/// subscribes to the same progress instead of starting another pull.
#[derive(Default)]
struct PullSlot {
    progress: Mutex<Option<broadcast::Sender<DownloadEvent>>>,
}

enum PullHandle {
    /// No pull was running; the caller starts one and publishes on the sender.
    Start(
        broadcast::Sender<DownloadEvent>,
        broadcast::Receiver<DownloadEvent>,
    ),
    Attach(broadcast::Receiver<DownloadEvent>),
}

impl PullSlot {
    fn in_flight(&self) -> bool {
        self.lock().is_some()
    }

    fn begin(&self) -> PullHandle {
        let mut slot = self.lock();
        if let Some(sender) = slot.as_ref() {
            return PullHandle::Attach(sender.subscribe());
        }
        let (tx, rx) = broadcast::channel(PULL_PROGRESS_CAPACITY);
        *slot = Some(tx.clone());
        PullHandle::Start(tx, rx)
    }

    fn finish(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<broadcast::Sender<DownloadEvent>>> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn progress_stream(rx: broadcast::Receiver<DownloadEvent>) -> BoxStream<'static, DownloadEvent> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "pull progress lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

impl OllamaModel {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("parse Ollama base URL: {base_url}"))?;
        // Keep a proxy prefix like `/ollama` when joining endpoint paths.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        if model.trim().is_empty() {
            return Err(anyhow!("Ollama model name is empty"));
        }
        Ok(Self {
            base_url,
            model: model.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs),
            pull: Arc::new(PullSlot::default()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("build Ollama URL for {path}"))?;
        Ok(url.to_string())
    }
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// `gemma3` matches a listed `gemma3:latest`.
fn model_listed(listed: &[TagEntry], wanted: &str) -> bool {
    listed.iter().any(|entry| {
        entry.name == wanted
            || (!wanted.contains(':') && entry.name == format!("{wanted}:latest"))
    })
}

fn pull_event(line: PullLine, started: &mut bool) -> Vec<DownloadEvent> {
    if let Some(message) = line.error {
        return vec![DownloadEvent::Failed { message }];
    }
    if line.status == "success" {
        return vec![DownloadEvent::Completed];
    }
    let mut events = Vec::new();
    if !*started {
        *started = true;
        events.push(DownloadEvent::Started {
            total_bytes: line.total,
        });
    }
    if let Some(downloaded_bytes) = line.completed {
        events.push(DownloadEvent::Progress { downloaded_bytes });
    }
    events
}

#[async_trait]
impl GenerativeModel for OllamaModel {
    async fn check_status(&self) -> Result<ReportedStatus> {
        if self.pull.in_flight() {
            return Ok(ReportedStatus::Known(ModelState::Downloading));
        }
        let url = self.endpoint("api/tags")?;
        let wanted = self.model.clone();
        // A server that is down or misbehaving says nothing about the device,
        // so those cases stay out of `Unavailable`.
        let status = tokio::task::spawn_blocking(move || {
            let tags: TagsResponse = match agent(STATUS_TIMEOUT).get(&url).call() {
                Ok(mut response) => match response.body_mut().read_json() {
                    Ok(tags) => tags,
                    Err(err) => {
                        tracing::warn!(%url, error = %err, "unreadable Ollama tags response");
                        return ReportedStatus::Unrecognized(format!(
                            "unreadable tags response: {err}"
                        ));
                    }
                },
                Err(err) => {
                    tracing::debug!(%url, error = %err, "Ollama server unreachable");
                    return ReportedStatus::Unrecognized(format!("server unreachable: {err}"));
                }
            };
            if model_listed(&tags.models, &wanted) {
                ReportedStatus::Known(ModelState::Available)
            } else {
                ReportedStatus::Known(ModelState::Downloadable)
            }
        })
        .await
        .context("join Ollama status task")?;
        Ok(status)
    }

    async fn download(&self) -> Result<BoxStream<'static, DownloadEvent>> {
        let url = self.endpoint("api/pull")?;
        let body = json!({ "model": self.model, "stream": true });
        let (tx, rx) = match self.pull.begin() {
            PullHandle::Attach(rx) => {
                tracing::debug!(model = %self.model, "attaching to pull in flight");
                return Ok(progress_stream(rx));
            }
            PullHandle::Start(tx, rx) => (tx, rx),
        };
        let pull = Arc::clone(&self.pull);

        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_connect(Some(CONNECT_TIMEOUT))
                .build()
                .into();
            match agent.post(url).send_json(&body) {
                Ok(response) => {
                    let reader = BufReader::new(response.into_body().into_reader());
                    let mut started = false;
                    for line in reader.lines() {
                        let line = match line {
                            Ok(line) => line,
                            Err(err) => {
                                let _ = tx.send(DownloadEvent::Failed {
                                    message: format!("read pull progress: {err}"),
                                });
                                break;
                            }
                        };
                        if line.trim().is_empty() {
                            continue;
                        }
                        let parsed: PullLine = match serde_json::from_str(&line) {
                            Ok(parsed) => parsed,
                            Err(err) => {
                                tracing::debug!(error = %err, "skipping unreadable pull line");
                                continue;
                            }
                        };
                        // Keep pulling even when nobody is watching.
                        for event in pull_event(parsed, &mut started) {
                            let _ = tx.send(event);
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(DownloadEvent::Failed {
                        message: format!("Ollama pull request failed: {err}"),
                    });
                }
            }
            pull.finish();
        });

        Ok(progress_stream(rx))
    }

    async fn generate_content(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let url = self.endpoint("api/generate")?;
        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "top_k": request.top_k,
                "num_predict": request.max_output_tokens,
            },
        });
        let timeout = self.timeout;
        let prompt_bytes = request.prompt.len();
        let start = Instant::now();

        let reply = tokio::task::spawn_blocking(move || -> Result<GenerateBody> {
            let mut response = agent(timeout)
                .post(&url)
                .send_json(&body)
                .with_context(|| format!("POST {url}"))?;
            response
                .body_mut()
                .read_json::<GenerateBody>()
                .context("parse Ollama generate response")
        })
        .await
        .context("join Ollama generate task")??;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            prompt_bytes,
            response_bytes = reply.response.len(),
            "lm invoke complete"
        );
        Ok(GenerateResponse::from_text(reply.response))
    }
}
