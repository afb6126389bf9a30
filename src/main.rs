use anyhow::{anyhow, Context, Result};
use barcode_enrich::classify::{classify, detect_category};
use barcode_enrich::config::{
    default_config_path, load_config, resolve_backend, resolve_log_path, write_config_stub,
    BackendConfig, Config, LM_COMMAND_ENV,
};
use barcode_enrich::enrich_log::{
    append_enrich_log, load_enrich_log, EnrichLogBuilder, EnrichLogEntry, InvocationKind,
};
use barcode_enrich::language::{device_language_code, resolve_language_name};
use barcode_enrich::model::{connect_with, ModelState, ReportedStatus};
use barcode_enrich::prompt::{build_description_prompt, build_enrichment_prompt};
use barcode_enrich::response::extract_json_object;
use barcode_enrich::{EnrichError, Enricher};
use clap::Parser;
use serde_json::json;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{
    ClassifyArgs, Command, DescribeArgs, EnrichArgs, ExtractArgs, HistoryArgs, InitConfigArgs,
    PromptArgs, RootArgs, StatusArgs,
};

/// Exit code for failures worth retrying later (sysexits `EX_TEMPFAIL`).
const EXIT_RETRY_LATER: u8 = 75;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let args = RootArgs::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match args.command {
        Command::Classify(args) => cmd_classify(args),
        Command::Prompt(args) => cmd_prompt(args, &config_path),
        Command::Extract(args) => cmd_extract(args),
        Command::Enrich(args) => cmd_enrich(args, &config_path).await,
        Command::Describe(args) => cmd_describe(args, &config_path).await,
        Command::Status(args) => cmd_status(args, &config_path).await,
        Command::WarmUp(args) => cmd_warm_up(args, &config_path).await,
        Command::History(args) => cmd_history(args, &config_path),
        Command::InitConfig(args) => cmd_init_config(args, &config_path),
    }
}

/// `BENRICH_LOG` wins over `RUST_LOG`; default is warnings only.
fn init_tracing() {
    let filter = std::env::var("BENRICH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_classify(args: ClassifyArgs) -> Result<ExitCode> {
    let kind = args.payload.kind.as_deref();
    let category = detect_category(&args.payload.content, kind);
    let facts = classify(&args.payload.content, kind);
    if args.json {
        let value = json!({ "category": category, "facts": facts });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serialize classification")?
        );
        return Ok(ExitCode::SUCCESS);
    }
    match category {
        Some(category) => println!("category: {category}"),
        None => println!("category: none"),
    }
    for fact in &facts {
        println!("- {fact}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_prompt(args: PromptArgs, config_path: &Path) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let payload = args.payload.payload();
    let request = args
        .request
        .request(payload, &config.language, config.humorous);
    let language = resolve_language_name(&request.language, device_language_code);
    let prompt = if args.describe_only {
        build_description_prompt(&request.payload, language)
    } else {
        let facts = classify(&request.payload.content, request.payload.kind.as_deref());
        build_enrichment_prompt(&request, &facts, language)
    };
    println!("{prompt}");
    Ok(ExitCode::SUCCESS)
}

fn cmd_extract(args: ExtractArgs) -> Result<ExitCode> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read reply from stdin")?;
            text
        }
    };
    match extract_json_object(&text) {
        Some(object) => {
            println!("{object}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("benrich: reply starts a JSON object but its braces never balance");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_enrich(args: EnrichArgs, config_path: &Path) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let enricher = build_enricher(args.backend.lm.as_deref(), &config)?;
    let request = args
        .request
        .request(args.payload.payload(), &config.language, config.humorous);
    let log = EnrichLogBuilder::new(InvocationKind::Enrich).with_payload(&request.payload);

    match enricher.enrich(&request).await {
        Ok(result) => {
            let names = result.tag_names().join(", ");
            record(
                args.no_log,
                &config,
                config_path,
                log.success(Some(result.tags.len()), names.clone()),
            );
            if args.json {
                let value = json!({ "ok": true, "result": result });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&value).context("serialize result")?
                );
            } else {
                println!("Tags: {names}");
                println!("Description: {}", result.description);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            record(args.no_log, &config, config_path, log.failed(&err));
            report_failure(&err, args.json)
        }
    }
}

async fn cmd_describe(args: DescribeArgs, config_path: &Path) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let enricher = build_enricher(args.backend.lm.as_deref(), &config)?;
    let payload = args.payload.payload();
    let language = args.language.unwrap_or_else(|| config.language.clone());
    let log = EnrichLogBuilder::new(InvocationKind::Describe).with_payload(&payload);

    match enricher.describe(&payload, &language).await {
        Ok(description) => {
            record(
                args.no_log,
                &config,
                config_path,
                log.success(None, description.clone()),
            );
            if args.json {
                let value = json!({ "ok": true, "description": description });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&value).context("serialize description")?
                );
            } else {
                println!("{description}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            record(args.no_log, &config, config_path, log.failed(&err));
            report_failure(&err, args.json)
        }
    }
}

async fn cmd_status(args: StatusArgs, config_path: &Path) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let enricher = build_enricher(args.backend.lm.as_deref(), &config)?;
    let status = enricher.status().await;
    let supported = matches!(
        &status,
        Ok(status) if *status != ReportedStatus::Known(ModelState::Unavailable)
    );

    if args.json {
        let value = match &status {
            Ok(status) => json!({ "status": status, "supported": supported }),
            Err(err) => json!({
                "supported": false,
                "failure_kind": err.kind(),
                "message": err.user_message(),
            }),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serialize status")?
        );
        return Ok(ExitCode::SUCCESS);
    }
    match &status {
        Ok(status) => println!("model: {status}"),
        Err(err) => println!("model: {}", err.user_message()),
    }
    println!("supported: {}", if supported { "yes" } else { "no" });
    Ok(ExitCode::SUCCESS)
}

async fn cmd_warm_up(args: StatusArgs, config_path: &Path) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let enricher = build_enricher(args.backend.lm.as_deref(), &config)?;
    let outcome = enricher.ensure_downloaded().await;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("serialize warm-up outcome")?
        );
    } else {
        println!("{outcome}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_history(args: HistoryArgs, config_path: &Path) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let log_path = resolve_log_path(&config, config_path);
    let entries = load_enrich_log(&log_path)?;
    let recent = &entries[entries.len().saturating_sub(args.limit)..];

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(recent).context("serialize history")?
        );
        return Ok(ExitCode::SUCCESS);
    }
    if recent.is_empty() {
        println!("no invocations logged at {}", log_path.display());
        return Ok(ExitCode::SUCCESS);
    }
    for entry in recent {
        println!("{}", history_line(entry));
    }
    Ok(ExitCode::SUCCESS)
}

fn history_line(entry: &EnrichLogEntry) -> String {
    let detail = match (&entry.failure_kind, &entry.summary) {
        (Some(kind), _) => kind.to_string(),
        (None, Some(summary)) => summary.clone(),
        (None, None) => String::new(),
    };
    format!(
        "{} {:<8} {:<7} {:>6}ms  {}  {}",
        entry.ts,
        entry.kind,
        entry.outcome,
        entry.duration_ms,
        detail,
        entry.content_preview.as_deref().unwrap_or("")
    )
}

fn cmd_init_config(args: InitConfigArgs, config_path: &Path) -> Result<ExitCode> {
    write_config_stub(config_path, args.force)?;
    println!("wrote {}", config_path.display());
    Ok(ExitCode::SUCCESS)
}

fn build_enricher(lm: Option<&str>, config: &Config) -> Result<Enricher> {
    let backend: BackendConfig = resolve_backend(lm, config).ok_or_else(|| {
        anyhow!("no model backend configured (pass --lm, set backend in the config file, or export {LM_COMMAND_ENV})")
    })?;
    tracing::debug!(?backend, "using model backend");
    Ok(Enricher::new(connect_with(move || backend.build()))
        .with_tag_color(config.tag_color.clone())
        .with_serialized_generation(config.serialize_generation))
}

fn record(no_log: bool, config: &Config, config_path: &Path, entry: EnrichLogEntry) {
    if no_log {
        return;
    }
    let log_path = resolve_log_path(config, config_path);
    if let Err(err) = append_enrich_log(&log_path, &entry) {
        tracing::warn!(error = %format!("{err:#}"), "could not append to invocation log");
    }
}

fn report_failure(err: &EnrichError, json: bool) -> Result<ExitCode> {
    tracing::debug!(error = %format!("{err:#}"), kind = %err.kind(), "request failed");
    if json {
        let value = json!({
            "ok": false,
            "failure_kind": err.kind(),
            "message": err.user_message(),
            "retryable": err.is_retryable(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serialize failure")?
        );
    } else if err.is_retryable() {
        eprintln!("benrich: {} (retryable)", err.user_message());
    } else {
        eprintln!("benrich: {}", err.user_message());
    }
    if err.is_retryable() {
        Ok(ExitCode::from(EXIT_RETRY_LATER))
    } else {
        Ok(ExitCode::FAILURE)
    }
}
