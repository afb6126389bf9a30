//! CLI argument parsing for `benrich`.
use barcode_enrich::{BarcodePayload, EnrichRequest};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "benrich",
    version,
    about = "Suggest tags and descriptions for scanned barcodes with a generative model",
    after_help = "Examples:\n  benrich classify 'WIFI:T:WPA2;S:HomeNetwork;P:secret;;'\n  benrich prompt https://www.youtube.com/watch?v=abc --type URL --tag Video\n  benrich enrich 8412345678901 --type Product --format EAN-13 --lm 'llm --no-stream'\n  benrich status --json\n  benrich history --limit 5",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Config file (default: <config dir>/barcode-enrich/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the facts the classifier extracts from a payload
    Classify(ClassifyArgs),
    /// Print the prompt that would be sent to the model
    Prompt(PromptArgs),
    /// Pull the first JSON object out of a model reply
    Extract(ExtractArgs),
    /// Suggest tags and a description
    Enrich(EnrichArgs),
    /// Generate a description only
    Describe(DescribeArgs),
    /// Report model status and device support
    Status(StatusArgs),
    /// Download the model if it is downloadable
    WarmUp(StatusArgs),
    /// Show recent enrich/describe invocations
    History(HistoryArgs),
    /// Write a starter config file
    InitConfig(InitConfigArgs),
}

/// The scanned barcode itself.
#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Raw decoded barcode text
    #[arg(value_name = "PAYLOAD")]
    pub content: String,

    /// Semantic type label (URL, Wi-Fi, Contact, Product, ISBN, ...)
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<String>,

    /// Symbology label (QR Code, EAN-13, ...)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,
}

impl PayloadArgs {
    pub fn payload(&self) -> BarcodePayload {
        BarcodePayload {
            content: self.content.clone(),
            kind: self.kind.clone(),
            format: self.format.clone(),
        }
    }
}

/// Request options shared by `prompt` and `enrich`.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Existing tag name the model may reuse (repeatable)
    #[arg(long = "tag", value_name = "NAME")]
    pub tags: Vec<String>,

    /// User-given title for the barcode
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// User notes about the barcode
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// ISO 639-1 language code, or "device" (default from config)
    #[arg(long, value_name = "CODE")]
    pub language: Option<String>,

    /// Ask for a light-hearted tone
    #[arg(long)]
    pub humorous: bool,
}

impl RequestArgs {
    /// Build a request, falling back to config values for language and tone.
    pub fn request(
        &self,
        payload: BarcodePayload,
        default_language: &str,
        default_humorous: bool,
    ) -> EnrichRequest {
        EnrichRequest {
            payload,
            existing_tags: self.tags.clone(),
            language: self
                .language
                .clone()
                .unwrap_or_else(|| default_language.to_string()),
            humorous: self.humorous || default_humorous,
            user_title: self.title.clone(),
            user_description: self.description.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct BackendArgs {
    /// LM command to run instead of the configured backend
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PromptArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Build the description-only prompt instead
    #[arg(long)]
    pub describe_only: bool,
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Read the reply from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct EnrichArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Do not append to the invocation log
    #[arg(long)]
    pub no_log: bool,
}

#[derive(Parser, Debug)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,

    /// ISO 639-1 language code, or "device" (default from config)
    #[arg(long, value_name = "CODE")]
    pub language: Option<String>,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Do not append to the invocation log
    #[arg(long)]
    pub no_log: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Number of most recent entries to show
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub limit: usize,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct InitConfigArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}
