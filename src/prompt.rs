//! Prompt assembly for the generative model.
//!
//! Templates live under `prompts/` and are compiled in. Rendering is a single
//! pass over `{placeholder}` markers, so braces inside payload text or user
//! notes are never re-expanded.
use crate::classify::format_facts;
use crate::types::{BarcodePayload, EnrichRequest, MAX_DESCRIPTION_CHARS};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const ENRICH_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/enrich.md"));
const DESCRIBE_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/describe.md"));

/// Maximum payload characters quoted into a prompt.
pub const MAX_PROMPT_CONTENT_CHARS: usize = 1000;
/// Maximum number of existing tag names offered for reuse.
pub const MAX_PROMPT_EXISTING_TAGS: usize = 50;
pub const MAX_USER_TITLE_CHARS: usize = 100;
pub const MAX_USER_DESCRIPTION_CHARS: usize = 200;

const HUMOR_RULE: &str = "\n- Use a funny, witty, and light-hearted tone. Make the user smile!";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("static placeholder regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace regex"));

/// Build the combined tags + description prompt.
///
/// `facts` are classifier facts for the payload and `language_name` is the
/// already resolved display name ("Spanish", "English", ...).
pub fn build_enrichment_prompt(
    request: &EnrichRequest,
    facts: &[String],
    language_name: &str,
) -> String {
    let payload = &request.payload;
    let mut sections = Vec::new();
    if let Some(definition) = barcode_definition(payload) {
        sections.push(definition);
    }
    if !facts.is_empty() {
        sections.push(format!("Extracted context:\n{}", format_facts(facts)));
    }
    if let Some(user) = user_context_section(
        request.user_title.as_deref(),
        request.user_description.as_deref(),
    ) {
        sections.push(user);
    }
    if let Some(tags) = existing_tags_line(&request.existing_tags) {
        sections.push(tags);
    }

    let content = cap_chars(&payload.content, MAX_PROMPT_CONTENT_CHARS);
    let context = context_block(&sections);
    let max_description = MAX_DESCRIPTION_CHARS.to_string();
    let tone_rule = if request.humorous { HUMOR_RULE } else { "" };
    render(
        ENRICH_TEMPLATE,
        &[
            ("language", language_name),
            ("content", &content),
            ("context", &context),
            ("max_description", &max_description),
            ("tone_rule", tone_rule),
        ],
    )
}

/// Build the description-only prompt (no tags, no user context).
pub fn build_description_prompt(payload: &BarcodePayload, language_name: &str) -> String {
    let sections: Vec<String> = barcode_definition(payload).into_iter().collect();
    let content = cap_chars(&payload.content, MAX_PROMPT_CONTENT_CHARS);
    let context = context_block(&sections);
    let max_description = MAX_DESCRIPTION_CHARS.to_string();
    render(
        DESCRIBE_TEMPLATE,
        &[
            ("language", language_name),
            ("content", &content),
            ("context", &context),
            ("max_description", &max_description),
        ],
    )
}

/// `Barcode definition: Type: X, Format: Y`, or `None` when both labels are blank.
pub fn barcode_definition(payload: &BarcodePayload) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(kind) = non_blank(payload.kind.as_deref()) {
        parts.push(format!("Type: {kind}"));
    }
    if let Some(format) = non_blank(payload.format.as_deref()) {
        parts.push(format!("Format: {format}"));
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!("Barcode definition: {}", parts.join(", ")))
}

/// Section carrying the user's own title and notes, omitted when both are blank.
pub fn user_context_section(title: Option<&str>, description: Option<&str>) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(title) = title.and_then(|raw| normalize_user_text(raw, MAX_USER_TITLE_CHARS)) {
        lines.push(format!("User-provided title: {title}"));
    }
    if let Some(description) =
        description.and_then(|raw| normalize_user_text(raw, MAX_USER_DESCRIPTION_CHARS))
    {
        lines.push(format!("User-provided description: {description}"));
    }
    if lines.is_empty() {
        return None;
    }
    Some(format!(
        "User-provided context (use this to refine the tags and description):\n{}",
        lines.join("\n")
    ))
}

/// Collapse whitespace runs, trim and cap. `None` when nothing is left.
pub fn normalize_user_text(raw: &str, max_chars: usize) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
    let capped = cap_chars(&collapsed, max_chars);
    let capped = capped.trim_end();
    if capped.is_empty() {
        None
    } else {
        Some(capped.to_string())
    }
}

fn existing_tags_line(existing: &[String]) -> Option<String> {
    let names: Vec<&str> = existing
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .take(MAX_PROMPT_EXISTING_TAGS)
        .collect();
    if names.is_empty() {
        return None;
    }
    Some(format!("Existing tags you can reuse: {}", names.join(", ")))
}

fn context_block(sections: &[String]) -> String {
    sections
        .iter()
        .map(|section| format!("{section}\n"))
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn cap_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn render(template: &str, values: &[(&str, &str)]) -> String {
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        values
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| (*value).to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });
    rendered.trim_end().to_string()
}
