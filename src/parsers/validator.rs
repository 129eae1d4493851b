//! Validation of decoded JSON against the canonical entry schema.
//!
//! Every input yields exactly one [`CanonicalEntry`]: a matching variant, or
//! [`CanonicalEntry::Error`] carrying the original line. Nothing here returns `Err`.
//!
//! A normalization pass runs before variant matching to absorb schema drift:
//! legacy `progress` records become system entries, system entries get a valid `level`
//! and synthesized `content` when missing, and a missing `parentUuid` becomes `null`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{CanonicalEntry, ErrorEntry, SystemLevel};

const ENTRY_TYPE_PROGRESS: &str = "progress";
const ENTRY_TYPE_SYSTEM: &str = "system";
const SUBTYPE_STOP_HOOK_SUMMARY: &str = "stop_hook_summary";

/// Validate one raw line. Unparseable JSON becomes an error entry holding `line` verbatim.
pub fn validate_line(line: &str) -> CanonicalEntry {
    match serde_json::from_str::<Value>(line) {
        Ok(value) => validate_value(value, line),
        Err(e) => {
            debug!(error = %e, "line is not valid JSON");
            error_entry(line)
        }
    }
}

/// Validate an already decoded value; `raw` is kept if validation fails.
pub fn validate_value(value: Value, raw: &str) -> CanonicalEntry {
    let Value::Object(mut object) = value else {
        return error_entry(raw);
    };
    normalize_entry(&mut object);

    match_variant(Value::Object(object)).unwrap_or_else(|| error_entry(raw))
}

/// Validate every non-empty line of a canonical JSONL text, preserving order.
pub fn parse_entries(text: &str) -> Vec<CanonicalEntry> {
    let entries: Vec<CanonicalEntry> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(validate_line)
        .collect();

    let failed = entries.iter().filter(|e| e.is_error()).count();
    if failed > 0 {
        debug!(total = entries.len(), failed, "parsed entries with validation errors");
    }
    entries
}

/// Rewrite drifted records in place so they match a canonical variant.
pub fn normalize_entry(object: &mut Map<String, Value>) {
    if entry_type(object) == Some(ENTRY_TYPE_PROGRESS) {
        rewrite_progress(object);
    }

    if entry_type(object) == Some(ENTRY_TYPE_SYSTEM) {
        normalize_system(object);
    }

    object.entry("parentUuid").or_insert(Value::Null);
}

fn entry_type(object: &Map<String, Value>) -> Option<&str> {
    object.get("type").and_then(Value::as_str)
}

fn error_entry(raw: &str) -> CanonicalEntry {
    CanonicalEntry::Error(ErrorEntry { raw: raw.to_string() })
}

// Variant order: user, assistant, summary, system, file-history-snapshot, queue-operation.
// The discriminator is mandatory and distinct per variant, so at most one can match.
fn match_variant(value: Value) -> Option<CanonicalEntry> {
    let entry_type = value.get("type").and_then(Value::as_str)?.to_string();

    match entry_type.as_str() {
        "user" => decode(value, CanonicalEntry::User),
        "assistant" => decode(value, CanonicalEntry::Assistant),
        "summary" => decode(value, CanonicalEntry::Summary),
        "system" => decode(value, CanonicalEntry::System),
        "file-history-snapshot" => decode(value, CanonicalEntry::FileHistorySnapshot),
        "queue-operation" => decode(value, CanonicalEntry::QueueOperation),
        other => {
            debug!(entry_type = other, "unrecognized entry type");
            None
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value, wrap: fn(T) -> CanonicalEntry) -> Option<CanonicalEntry> {
    match serde_json::from_value::<T>(value) {
        Ok(variant) => Some(wrap(variant)),
        Err(e) => {
            debug!(error = %e, "entry failed schema validation");
            None
        }
    }
}

fn rewrite_progress(object: &mut Map<String, Value>) {
    let data = object.remove("data").unwrap_or(Value::Null);
    object.insert("type".to_string(), Value::from(ENTRY_TYPE_SYSTEM));
    object.insert("subtype".to_string(), Value::from(ENTRY_TYPE_PROGRESS));
    object.insert("level".to_string(), Value::from("info"));
    object.insert("content".to_string(), Value::from(describe_progress(&data)));
}

fn describe_progress(data: &Value) -> String {
    let mut parts = Vec::new();
    match data.get("type").and_then(Value::as_str) {
        Some("hook_progress") => {
            parts.push("Hook progress".to_string());
            if let Some(name) = data.get("hookName").and_then(scalar_text) {
                parts.push(format!("Hook: {}", name));
            }
            if let Some(event) = data.get("hookEvent").and_then(scalar_text) {
                parts.push(format!("Event: {}", event));
            }
        }
        Some("bash_progress") => {
            parts.push("Bash progress".to_string());
            if let Some(elapsed) = data.get("elapsedTimeSeconds").and_then(scalar_text) {
                parts.push(format!("Elapsed: {}s", elapsed));
            }
            if let Some(lines) = data.get("totalLines").and_then(scalar_text) {
                parts.push(format!("Lines: {}", lines));
            }
        }
        _ => parts.push("Progress update".to_string()),
    }
    parts.join(". ")
}

fn normalize_system(object: &mut Map<String, Value>) {
    let level_ok = object
        .get("level")
        .and_then(Value::as_str)
        .is_some_and(|level| SystemLevel::ALL.contains(&level));
    if !level_ok {
        object.insert("level".to_string(), Value::from("info"));
    }

    let has_content = object.get("content").is_some_and(|c| match c {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    });
    if !has_content {
        let content = match object.get("subtype").and_then(Value::as_str) {
            Some(SUBTYPE_STOP_HOOK_SUMMARY) => format_stop_hook_summary(object),
            Some(subtype) => humanize_label(subtype),
            None => "System message".to_string(),
        };
        object.insert("content".to_string(), Value::from(content));
    }
}

fn format_stop_hook_summary(object: &Map<String, Value>) -> String {
    let commands: Vec<String> = object
        .get("hookInfos")
        .and_then(Value::as_array)
        .map(|infos| {
            infos
                .iter()
                .filter_map(|info| info.get("command").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let count = object
        .get("hookCount")
        .and_then(Value::as_u64)
        .unwrap_or(commands.len() as u64);
    let prevented =
        object.get("preventedContinuation").and_then(Value::as_bool).unwrap_or(false);
    let reason = object
        .get("stopReason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let mut summary = format!(
        "Stop hook summary: {} hook{} ran",
        count,
        if count == 1 { "" } else { "s" }
    );
    if !commands.is_empty() {
        summary.push_str(&format!(" ({})", commands.join(", ")));
    }
    if prevented {
        summary.push_str(", continuation prevented");
    }
    match reason {
        Some(reason) => summary.push_str(&format!(". Stop reason: {}", reason)),
        None => summary.push('.'),
    }
    summary
}

/// `compact_boundary` -> `Compact boundary`
fn humanize_label(label: &str) -> String {
    let spaced = label.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "System message".to_string(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
