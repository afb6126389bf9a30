//! End-to-end enrichment: gate, prompt, generate, extract, normalize.
//!
//! Classification and prompt building are pure. Everything touching the model
//! goes through a lazily connected, cached handle. When generation is
//! serialized, at most one generate call is in flight per [`Enricher`].
use crate::classify::classify;
use crate::error::EnrichError;
use crate::language::{device_language_code, resolve_language_name};
use crate::model::{
    self, GenerateRequest, GenerativeModel, ModelConnector, ModelState, ReportedStatus, WarmUp,
};
use crate::normalize::{normalize_description_reply, normalize_reply};
use crate::prompt::{build_description_prompt, build_enrichment_prompt};
use crate::types::{BarcodePayload, EnrichRequest, EnrichmentResult, DEFAULT_TAG_COLOR};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

type DeviceLanguage = Box<dyn Fn() -> String + Send + Sync>;

pub struct Enricher {
    connector: Box<dyn ModelConnector>,
    handle: Mutex<Option<Arc<dyn GenerativeModel>>>,
    generation_lock: Option<Mutex<()>>,
    device_language: DeviceLanguage,
    tag_color: String,
}

impl Enricher {
    /// Pipeline with serialized generation, default tag color and the
    /// process locale as device language.
    pub fn new(connector: impl ModelConnector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            handle: Mutex::new(None),
            generation_lock: Some(Mutex::new(())),
            device_language: Box::new(device_language_code),
            tag_color: DEFAULT_TAG_COLOR.to_string(),
        }
    }

    pub fn with_tag_color(mut self, color: impl Into<String>) -> Self {
        self.tag_color = color.into();
        self
    }

    pub fn with_serialized_generation(mut self, serialize: bool) -> Self {
        self.generation_lock = serialize.then(|| Mutex::new(()));
        self
    }

    pub fn with_device_language<F>(mut self, device_language: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.device_language = Box::new(device_language);
        self
    }

    /// Suggest up to three tags and a description for a barcode.
    pub async fn enrich(&self, request: &EnrichRequest) -> Result<EnrichmentResult, EnrichError> {
        let model = self.ready_model().await?;
        let payload = &request.payload;
        let facts = classify(&payload.content, payload.kind.as_deref());
        let language = resolve_language_name(&request.language, || (self.device_language)());
        let prompt = build_enrichment_prompt(request, &facts, language);
        tracing::debug!(
            kind = payload.kind.as_deref().unwrap_or(""),
            facts = facts.len(),
            language,
            "built enrichment prompt"
        );

        let text = self
            .generate(model.as_ref(), GenerateRequest::for_enrichment(prompt))
            .await?;
        let result = normalize_reply(&text, &self.tag_color)?;
        tracing::info!(
            tags = result.tags.len(),
            description_chars = result.description.chars().count(),
            "enrichment complete"
        );
        Ok(result)
    }

    /// Generate only a description, in the given language code.
    pub async fn describe(
        &self,
        payload: &BarcodePayload,
        language: &str,
    ) -> Result<String, EnrichError> {
        let model = self.ready_model().await?;
        let language = resolve_language_name(language, || (self.device_language)());
        let prompt = build_description_prompt(payload, language);
        let text = self
            .generate(model.as_ref(), GenerateRequest::for_description(prompt))
            .await?;
        Ok(normalize_description_reply(&text))
    }

    /// Current model status, connecting first if needed.
    pub async fn status(&self) -> Result<ReportedStatus, EnrichError> {
        let model = self.model().await?;
        query_status(model.as_ref()).await
    }

    /// `false` only when the model reports `Unavailable` or no status can be had.
    pub async fn is_supported_on_device(&self) -> bool {
        match self.status().await {
            Ok(ReportedStatus::Known(ModelState::Unavailable)) => false,
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "model support check failed");
                false
            }
        }
    }

    /// Best-effort model download. Never fails.
    pub async fn ensure_downloaded(&self) -> WarmUp {
        match self.model().await {
            Ok(model) => model::ensure_downloaded(model.as_ref()).await,
            Err(err) => {
                tracing::error!(error = %err, "no model client for warm-up");
                WarmUp::StatusUnknown {
                    reported: err.to_string(),
                }
            }
        }
    }

    /// Drop the cached model handle; the next call reconnects.
    pub async fn reset(&self) {
        if self.handle.lock().await.take().is_some() {
            tracing::debug!("model handle released");
        }
    }

    async fn model(&self) -> Result<Arc<dyn GenerativeModel>, EnrichError> {
        let mut handle = self.handle.lock().await;
        if let Some(model) = handle.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = self.connector.connect().await.map_err(|err| {
            tracing::error!(error = %format!("{err:#}"), "model client init failed");
            EnrichError::ClientInitFailed {
                message: format!("{err:#}"),
            }
        })?;
        *handle = Some(Arc::clone(&model));
        Ok(model)
    }

    async fn ready_model(&self) -> Result<Arc<dyn GenerativeModel>, EnrichError> {
        let model = self.model().await?;
        let status = query_status(model.as_ref()).await?;
        model::admit(&status)?;
        Ok(model)
    }

    async fn generate(
        &self,
        model: &dyn GenerativeModel,
        request: GenerateRequest,
    ) -> Result<String, EnrichError> {
        let _guard = match &self.generation_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        let start = Instant::now();
        let response = model
            .generate_content(request)
            .await
            .context("generate content")?;
        let text = response.first_text();
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis(),
            reply = text,
            "model reply"
        );
        if text.is_empty() {
            return Err(EnrichError::EmptyModelResponse);
        }
        Ok(text.to_string())
    }
}

async fn query_status(model: &dyn GenerativeModel) -> Result<ReportedStatus, EnrichError> {
    let status = model
        .check_status()
        .await
        .context("query model status")?;
    tracing::debug!(%status, "model status");
    Ok(status)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
