//! Preview extraction: the first meaningful user message of a session, shortened.
//!
//! Works on a byte-bounded prefix of the file, so a truncated trailing line is expected
//! and simply fails to parse. Codex files open with long instruction blocks, so their
//! sample is four times larger.

use serde_json::Value;

use crate::models::Provider;
use crate::parsers::meta::{MetaFilter, is_meta_content};

/// Maximum preview length in characters (an ellipsis is appended when cut)
pub const PREVIEW_MAX_CHARS: usize = 100;

pub const CLAUDE_PREVIEW_BYTES: usize = 16 * 1024;
pub const CODEX_PREVIEW_BYTES: usize = 4 * CLAUDE_PREVIEW_BYTES;

/// How many leading bytes to sample when computing a preview for `provider`.
pub fn preview_sample_bytes(provider: Provider) -> usize {
    match provider {
        Provider::Claude => CLAUDE_PREVIEW_BYTES,
        Provider::Codex => CODEX_PREVIEW_BYTES,
    }
}

/// First usable user snippet in `text`, or an empty string.
pub fn extract_preview(text: &str) -> String {
    first_preview(text, is_meta_content)
}

/// [`extract_preview`] with custom meta-content patterns.
pub fn extract_preview_with(text: &str, filter: &MetaFilter) -> String {
    first_preview(text, |candidate| filter.is_meta(candidate))
}

fn first_preview(text: &str, is_meta: impl Fn(&str) -> bool) -> String {
    for line in text.lines() {
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(candidate) = candidate_text(&value) else {
            continue;
        };

        let collapsed = collapse_whitespace(candidate);
        if collapsed.is_empty() || is_meta(&collapsed) {
            continue;
        }
        return truncate_preview(&collapsed);
    }
    String::new()
}

fn candidate_text(value: &Value) -> Option<&str> {
    match value.get("type").and_then(Value::as_str)? {
        "user" => {
            if value.get("isMeta").and_then(Value::as_bool) == Some(true) {
                return None;
            }
            match value.pointer("/message/content")? {
                Value::String(s) => Some(s),
                Value::Array(items) => items
                    .iter()
                    .find(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                    .and_then(|item| item.get("text"))
                    .and_then(Value::as_str),
                _ => None,
            }
        }
        "response_item" => {
            let payload = value.get("payload")?;
            if payload.get("type").and_then(Value::as_str) != Some("message")
                || payload.get("role").and_then(Value::as_str) != Some("user")
            {
                return None;
            }
            match payload.get("content")? {
                Value::String(s) => Some(s),
                Value::Array(items) => items
                    .iter()
                    .find(|item| {
                        matches!(
                            item.get("type").and_then(Value::as_str),
                            Some("input_text" | "text")
                        )
                    })
                    .and_then(|item| item.get("text"))
                    .and_then(Value::as_str),
                _ => None,
            }
        }
        "event_msg" => {
            let payload = value.get("payload")?;
            if payload.get("type").and_then(Value::as_str) != Some("user_message") {
                return None;
            }
            payload.get("message").and_then(Value::as_str)
        }
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_MAX_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
    cut.push('…');
    cut
}
