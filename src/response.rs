//! Isolating the JSON object inside a free-form model reply.
//!
//! Small on-device models rarely answer with bare JSON: they wrap it in
//! markdown fences, prepend "Sure! Here you go", or trail off with chatter
//! that may itself contain braces. The scanner here balances braces while
//! tracking string literals, so only the first complete object is returned.
//! It does not validate the JSON beyond that balance.
use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("static fence regex"));

/// Extract the first balanced `{...}` object from a model reply.
///
/// Returns the fence-stripped, trimmed text unchanged when it contains no `{`
/// at all (callers treat that as "not JSON"), and `None` when an object starts
/// but its braces never balance.
pub fn extract_json_object(text: &str) -> Option<String> {
    let stripped = strip_code_fences(text);
    let stripped = stripped.trim();

    let Some(start) = stripped.find('{') else {
        return Some(stripped.to_string());
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in stripped[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(stripped[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove every triple-backtick marker, with or without a language tag.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}
