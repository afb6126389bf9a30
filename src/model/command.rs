//! Model backend that shells out to a user-configured LM command.
//!
//! The command line is split with shell-words. The prompt goes to the child's
//! stdin and its stdout is the reply. Sampling parameters are exported as
//! environment variables so wrapper scripts can forward them:
//!
//! - `BENRICH_TEMPERATURE`
//! - `BENRICH_TOP_K`
//! - `BENRICH_CANDIDATE_COUNT`
//! - `BENRICH_MAX_OUTPUT_TOKENS`
//!
//! Dropping the generation future kills the child.
use super::{
    DownloadEvent, GenerateRequest, GenerateResponse, GenerativeModel, ModelState, ReportedStatus,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::io;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct CommandModel {
    argv: Vec<String>,
}

impl CommandModel {
    /// Parse a command line like `llm -m gemma3 --no-stream`.
    pub fn new(command: &str) -> Result<Self> {
        let argv =
            shell_words::split(command).with_context(|| format!("parse LM command: {command}"))?;
        if argv.is_empty() {
            return Err(anyhow!("LM command is empty"));
        }
        Ok(Self { argv })
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }
}

#[async_trait]
impl GenerativeModel for CommandModel {
    async fn check_status(&self) -> Result<ReportedStatus> {
        let state = match which::which(self.program()) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "LM command resolved");
                ModelState::Available
            }
            Err(err) => {
                tracing::debug!(program = self.program(), error = %err, "LM command not found");
                ModelState::Unavailable
            }
        };
        Ok(ReportedStatus::Known(state))
    }

    async fn download(&self) -> Result<BoxStream<'static, DownloadEvent>> {
        Ok(stream::empty().boxed())
    }

    async fn generate_content(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let start = Instant::now();
        let mut child = Command::new(self.program())
            .args(&self.argv[1..])
            .env("BENRICH_TEMPERATURE", request.temperature.to_string())
            .env("BENRICH_TOP_K", request.top_k.to_string())
            .env("BENRICH_CANDIDATE_COUNT", request.candidate_count.to_string())
            .env(
                "BENRICH_MAX_OUTPUT_TOKENS",
                request.max_output_tokens.to_string(),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawn LM command: {}", self.program()))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(request.prompt.as_bytes()).await {
                Ok(()) => {}
                // The child may answer without reading its input.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!(program = self.program(), "LM command closed stdin early");
                }
                Err(err) => return Err(err).context("write prompt to LM stdin"),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("wait for LM command")?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            elapsed_ms,
            prompt_bytes = request.prompt.len(),
            response_bytes = output.stdout.len(),
            "lm invoke complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "LM command failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let text = String::from_utf8(output.stdout).context("decode LM stdout as UTF-8")?;
        Ok(GenerateResponse::from_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_arguments() {
        let model = CommandModel::new(r#"llm -m "gemma 3" --no-stream"#).expect("parse");
        assert_eq!(model.program(), "llm");
        assert_eq!(model.argv, vec!["llm", "-m", "gemma 3", "--no-stream"]);
    }

    #[test]
    fn rejects_empty_and_unbalanced_commands() {
        assert!(CommandModel::new("   ").is_err());
        assert!(CommandModel::new("llm 'unterminated").is_err());
    }

    #[tokio::test]
    async fn missing_program_reports_unavailable() {
        let model = CommandModel::new("benrich-no-such-lm-binary --flag").expect("parse");
        let status = model.check_status().await.expect("status");
        assert_eq!(status, ReportedStatus::Known(ModelState::Unavailable));
    }

    #[tokio::test]
    async fn echoes_stdin_through_cat() {
        if which::which("cat").is_err() {
            return;
        }
        let model = CommandModel::new("cat").expect("parse");
        assert_eq!(
            model.check_status().await.expect("status"),
            ReportedStatus::Known(ModelState::Available)
        );
        let response = model
            .generate_content(GenerateRequest::for_enrichment("{\"tags\": []}"))
            .await
            .expect("generate");
        assert_eq!(response.first_text(), "{\"tags\": []}");
    }

    #[tokio::test]
    async fn exports_generation_parameters() {
        if which::which("sh").is_err() {
            return;
        }
        let model = CommandModel::new(
            r#"sh -c 'cat >/dev/null; echo "$BENRICH_TEMPERATURE $BENRICH_TOP_K $BENRICH_CANDIDATE_COUNT $BENRICH_MAX_OUTPUT_TOKENS"'"#,
        )
        .expect("parse");
        let response = model
            .generate_content(GenerateRequest::for_description("prompt"))
            .await
            .expect("generate");
        assert_eq!(response.first_text(), "0.4 20 1 100");
    }

    #[tokio::test]
    async fn reply_counts_even_when_stdin_is_never_read() {
        if which::which("sh").is_err() {
            return;
        }
        let model = CommandModel::new(r#"sh -c 'printf "{\"tags\":[\"A\"]}"'"#).expect("parse");
        let prompt = "x".repeat(256 * 1024);
        for _ in 0..20 {
            let response = model
                .generate_content(GenerateRequest::for_enrichment(prompt.clone()))
                .await
                .expect("generate");
            assert_eq!(response.first_text(), r#"{"tags":["A"]}"#);
        }
    }

    #[tokio::test]
    async fn failing_command_surfaces_stderr() {
        if which::which("sh").is_err() {
            return;
        }
        let model = CommandModel::new(r#"sh -c 'cat >/dev/null; echo quota exceeded >&2; exit 3'"#)
            .expect("parse");
        let err = model
            .generate_content(GenerateRequest::for_enrichment("p"))
            .await
            .expect_err("non-zero exit");
        assert!(err.to_string().contains("quota exceeded"), "{err}");
    }
}
