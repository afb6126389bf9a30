//! User configuration for the `benrich` binary.
//!
//! A single JSON file, by default `<config dir>/barcode-enrich/config.json`.
//! Unknown fields are rejected so typos surface instead of silently reverting
//! to defaults.
use crate::language::DEVICE_LANGUAGE;
use crate::model::ollama::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::model::{CommandModel, GenerativeModel, OllamaModel};
use crate::types::DEFAULT_TAG_COLOR;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const LM_COMMAND_ENV: &str = "BENRICH_LM_COMMAND";
const CONFIG_DIR_NAME: &str = "barcode-enrich";
const CONFIG_FILE_NAME: &str = "config.json";
const LOG_FILE_NAME: &str = "enrich_log.jsonl";

static TAG_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").expect("static color regex")
});

/// Where generation requests go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Any command reading a prompt on stdin and answering on stdout.
    Command { command: String },
    Ollama {
        #[serde(default = "default_base_url")]
        base_url: String,
        model: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl BackendConfig {
    pub fn build(&self) -> Result<Arc<dyn GenerativeModel>> {
        let model: Arc<dyn GenerativeModel> = match self {
            Self::Command { command } => Arc::new(CommandModel::new(command)?),
            Self::Ollama {
                base_url,
                model,
                timeout_secs,
            } => Arc::new(OllamaModel::new(base_url, model, *timeout_secs)?),
        };
        Ok(model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
    /// ISO 639-1 code or `device`.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub humorous: bool,
    #[serde(default = "default_tag_color")]
    pub tag_color: String,
    /// Hold a lock around each generate call.
    #[serde(default = "default_true")]
    pub serialize_generation: bool,
    /// Invocation log location; defaults next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            backend: None,
            language: default_language(),
            humorous: false,
            tag_color: default_tag_color(),
            serialize_generation: true,
            log_path: None,
        }
    }
}

fn default_language() -> String {
    DEVICE_LANGUAGE.to_string()
}

fn default_tag_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// `<config dir>/barcode-enrich/config.json`.
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine config directory"))?;
    Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Invocation log path: the configured one, else beside the config file.
pub fn resolve_log_path(config: &Config, config_path: &Path) -> PathBuf {
    if let Some(path) = &config.log_path {
        return path.clone();
    }
    config_path
        .parent()
        .map(|dir| dir.join(LOG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
}

/// Pretty JSON for a fresh config with a command backend placeholder.
pub fn config_stub() -> Result<String> {
    let config = Config {
        backend: Some(BackendConfig::Command {
            command: "llm --no-stream".to_string(),
        }),
        ..Config::default()
    };
    serde_json::to_string_pretty(&config).context("serialize config stub")
}

/// Load and validate a config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Write the stub, refusing to clobber an existing file unless forced.
pub fn write_config_stub(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create config dir")?;
    }
    let text = config_stub()?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if !TAG_COLOR.is_match(&config.tag_color) {
        return Err(anyhow!(
            "tag_color must be #RRGGBB or #AARRGGBB (got {:?})",
            config.tag_color
        ));
    }
    if config.language.trim().is_empty() {
        return Err(anyhow!("language must be non-empty (use \"device\" for the locale)"));
    }
    match &config.backend {
        Some(BackendConfig::Command { command }) if command.trim().is_empty() => {
            Err(anyhow!("backend.command must be non-empty"))
        }
        Some(BackendConfig::Ollama { model, .. }) if model.trim().is_empty() => {
            Err(anyhow!("backend.model must be non-empty"))
        }
        _ => Ok(()),
    }
}

/// Pick the backend: explicit `--lm` command, then config, then
/// `BENRICH_LM_COMMAND`.
pub fn resolve_backend(explicit: Option<&str>, config: &Config) -> Option<BackendConfig> {
    resolve_backend_with_env(explicit, config, std::env::var(LM_COMMAND_ENV).ok())
}

fn resolve_backend_with_env(
    explicit: Option<&str>,
    config: &Config,
    env_command: Option<String>,
) -> Option<BackendConfig> {
    explicit
        .map(|command| BackendConfig::Command {
            command: command.to_string(),
        })
        .or_else(|| config.backend.clone())
        .or_else(|| {
            env_command
                .filter(|command| !command.trim().is_empty())
                .map(|command| BackendConfig::Command { command })
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
