//! Native/foreign format detection.
//!
//! A path under a Codex-only root is Codex without reading it. Otherwise the first
//! parseable JSON line decides: Codex record envelopes mean Codex, canonical discriminators
//! mean Claude, and anything else (including files with no parseable line) is Claude.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::models::Provider;

const CODEX_RECORD_TYPES: &[&str] =
    &["session_meta", "response_item", "event_msg", "turn_context", "compacted"];

const CLAUDE_ENTRY_TYPES: &[&str] = &[
    "user",
    "assistant",
    "system",
    "summary",
    "file-history-snapshot",
    "queue-operation",
    "progress",
];

/// Classify by location only; `None` when the path is not under any Codex root.
pub fn classify_path(path: &Path, codex_roots: &[PathBuf]) -> Option<Provider> {
    codex_roots.iter().any(|root| path.starts_with(root)).then_some(Provider::Codex)
}

/// Classify by sniffing the first parseable JSON line of `text`.
pub fn classify_content(text: &str) -> Provider {
    let first = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .find_map(|line| serde_json::from_str::<Value>(line).ok());

    let Some(value) = first else {
        return Provider::Claude;
    };
    let record_type = value.get("type").and_then(Value::as_str);

    match record_type {
        Some(t) if CLAUDE_ENTRY_TYPES.contains(&t) => Provider::Claude,
        Some(t) if CODEX_RECORD_TYPES.contains(&t) && value.get("payload").is_some() => {
            Provider::Codex
        }
        _ => Provider::Claude,
    }
}

/// Path first, then content.
pub fn classify(path: &Path, codex_roots: &[PathBuf], text: &str) -> Provider {
    classify_path(path, codex_roots).unwrap_or_else(|| classify_content(text))
}
