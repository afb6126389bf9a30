//! Turning a raw model reply into a bounded [`EnrichmentResult`].
//!
//! Tags and description are recovered independently: a reply with a usable
//! description but a broken `tags` field still yields the description, and
//! tags fall back to comma splitting of the raw reply.
use crate::error::EnrichError;
use crate::response::extract_json_object;
use crate::types::{
    EnrichmentResult, SuggestedTag, MAX_DESCRIPTION_CHARS, MAX_TAGS, MAX_TAG_NAME_CHARS,
};
use serde_json::Value;
use std::collections::HashSet;

const ELLIPSIS: &str = "...";
const PREVIEW_CHARS: usize = 120;

/// Parse a combined tags + description reply.
///
/// `raw` must already be known to be non-empty; emptiness is reported by the
/// pipeline as [`EnrichError::EmptyModelResponse`] before this is called.
pub fn normalize_reply(raw: &str, tag_color: &str) -> Result<EnrichmentResult, EnrichError> {
    let object = parse_object(raw);

    let tag_names = match object.as_ref().and_then(tags_from_object) {
        Some(names) => names,
        None => {
            tracing::warn!("tags missing from model JSON, falling back to comma split");
            raw.split(',').map(|piece| piece.trim().to_string()).collect()
        }
    };
    let tags = normalize_tags(tag_names, tag_color);

    let description = object
        .as_ref()
        .and_then(|value| value.get("description"))
        .and_then(Value::as_str)
        .map(cap_description)
        .unwrap_or_else(|| {
            tracing::warn!("description missing from model JSON");
            String::new()
        });

    if tags.is_empty() && description.is_empty() {
        return Err(EnrichError::MalformedModelOutput {
            preview: preview(raw),
        });
    }
    Ok(EnrichmentResult { tags, description })
}

/// Parse a description-only reply: the JSON `description` when present,
/// otherwise the whole reply text.
pub fn normalize_description_reply(raw: &str) -> String {
    let description = parse_object(raw)
        .as_ref()
        .and_then(|value| value.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string);
    match description {
        Some(description) => cap_description(&description),
        None => {
            tracing::warn!("description JSON not found, using raw reply text");
            cap_description(raw)
        }
    }
}

/// Trim, drop empty or over-long names, dedupe (first wins), cap, wrap.
pub fn normalize_tags<I>(names: I, tag_color: &str) -> Vec<SuggestedTag>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && name.chars().count() <= MAX_TAG_NAME_CHARS)
        .filter(|name| seen.insert(name.clone()))
        .take(MAX_TAGS)
        .map(|name| SuggestedTag::unselected(name, tag_color))
        .collect()
}

/// Trim and cap to [`MAX_DESCRIPTION_CHARS`], ending in `...` when cut.
pub fn cap_description(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX_DESCRIPTION_CHARS {
        return trimmed.to_string();
    }
    let kept: String = trimmed
        .chars()
        .take(MAX_DESCRIPTION_CHARS - ELLIPSIS.len())
        .collect();
    format!("{kept}{ELLIPSIS}")
}

fn parse_object(raw: &str) -> Option<Value> {
    let candidate = extract_json_object(raw)?;
    match serde_json::from_str::<Value>(&candidate) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(error = %err, "model reply is not valid JSON");
            None
        }
    }
}

fn tags_from_object(object: &Value) -> Option<Vec<String>> {
    let array = object.get("tags")?.as_array()?;
    Some(
        array
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name.clone()),
                Value::Number(number) => Some(number.to_string()),
                Value::Bool(flag) => Some(flag.to_string()),
                _ => None,
            })
            .collect(),
    )
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_CHARS).collect()
}
