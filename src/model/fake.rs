//! Scripted in-memory model for unit tests.
use super::{
    DownloadEvent, GenerateRequest, GenerateResponse, GenerativeModel, ModelState, ReportedStatus,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) struct FakeModel {
    status: Mutex<std::result::Result<ReportedStatus, String>>,
    replies: Mutex<VecDeque<std::result::Result<GenerateResponse, String>>>,
    download_events: Vec<DownloadEvent>,
    download_error: Option<String>,
    requests: Mutex<Vec<GenerateRequest>>,
    generate_calls: AtomicUsize,
    download_calls: AtomicUsize,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    generate_delay: Duration,
}

impl FakeModel {
    pub(crate) fn new(state: ModelState) -> Self {
        Self::reporting(ReportedStatus::Known(state))
    }

    pub(crate) fn reporting(status: ReportedStatus) -> Self {
        Self {
            status: Mutex::new(Ok(status)),
            replies: Mutex::new(VecDeque::new()),
            download_events: Vec::new(),
            download_error: None,
            requests: Mutex::new(Vec::new()),
            generate_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            generate_delay: Duration::ZERO,
        }
    }

    pub(crate) fn failing_status(message: &str) -> Self {
        let model = Self::new(ModelState::Available);
        *model.status.lock().expect("status lock") = Err(message.to_string());
        model
    }

    pub(crate) fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok(GenerateResponse::from_text(text)));
        self
    }

    pub(crate) fn reply_response(self, response: GenerateResponse) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok(response));
        self
    }

    pub(crate) fn reply_error(self, message: &str) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn download_events(mut self, events: Vec<DownloadEvent>) -> Self {
        self.download_events = events;
        self
    }

    pub(crate) fn download_error(mut self, message: &str) -> Self {
        self.download_error = Some(message.to_string());
        self
    }

    /// Suspend inside every generate call so concurrent callers can overlap.
    pub(crate) fn generate_delay(mut self, delay: Duration) -> Self {
        self.generate_delay = delay;
        self
    }

    pub(crate) fn set_state(&self, state: ModelState) {
        *self.status.lock().expect("status lock") = Ok(ReportedStatus::Known(state));
    }

    pub(crate) fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Most generate calls ever running at once.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn check_status(&self) -> Result<ReportedStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status
            .lock()
            .expect("status lock")
            .clone()
            .map_err(|message| anyhow!(message))
    }

    async fn download(&self) -> Result<BoxStream<'static, DownloadEvent>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.download_error {
            return Err(anyhow!(message.clone()));
        }
        Ok(stream::iter(self.download_events.clone()).boxed())
    }

    async fn generate_content(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.generate_delay.is_zero() {
            tokio::time::sleep(self.generate_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.requests.lock().expect("requests lock").push(request);
        let next = self.replies.lock().expect("replies lock").pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply")),
        }
    }
}
