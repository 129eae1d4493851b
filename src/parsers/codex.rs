//! Conversion of Codex CLI rollout logs into the canonical entry schema.
//!
//! Codex stores sessions in:
//! ~/.codex/sessions/YYYY/MM/DD/rollout-{timestamp}-{uuid}.jsonl
//!
//! Record types:
//! - session_meta: Session metadata (id, cwd, cli_version, thread-spawn source)
//! - turn_context: Per-turn cwd and model
//! - response_item: Messages, function calls, reasoning, web searches
//! - event_msg: UI events; user/agent messages here are only used when the file has no
//!   `response_item` messages, otherwise they would duplicate them
//!
//! Conversion is a single forward pass. A [`SessionContext`] accumulates metadata and is
//! stamped onto every emitted entry; entries emitted before the metadata arrives keep the
//! incomplete context. Lines that are not JSON records are passed through untouched so the
//! validator turns them into error entries in place.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AssistantContent, AssistantEntry, CanonicalEntry, EntryMeta, Message, MessageBody,
    SystemEntry, SystemLevel, UserContent, UserEntry,
};
use crate::parsers::meta::MetaFilter;

/// Codex JSONL record envelope
#[derive(Debug, Deserialize)]
struct CodexRecord {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    payload: Value,
}

/// Metadata accumulated while converting one rollout file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub cwd: String,
    pub version: Option<String>,
    pub model: Option<String>,
    /// Set from a thread-spawn source; never cleared afterwards.
    pub parent_agent_id: Option<String>,
}

impl SessionContext {
    fn apply_session_meta(&mut self, payload: &Value) {
        overwrite(&mut self.session_id, payload.get("id"));
        overwrite(&mut self.cwd, payload.get("cwd"));
        overwrite_opt(&mut self.version, payload.get("cli_version"));
        overwrite_opt(&mut self.model, payload.get("model"));

        let parent = payload
            .pointer("/source/subagent/thread_spawn/parent_thread_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty());
        if let Some(parent) = parent {
            self.parent_agent_id = Some(parent.to_string());
        }
    }

    fn apply_turn_context(&mut self, payload: &Value) {
        overwrite(&mut self.cwd, payload.get("cwd"));
        overwrite_opt(&mut self.model, payload.get("model"));
    }

    fn entry_meta(&self, timestamp: Option<DateTime<Utc>>) -> EntryMeta {
        EntryMeta {
            uuid: Uuid::new_v4().to_string(),
            session_id: self.session_id.clone(),
            cwd: self.cwd.clone(),
            parent_uuid: None,
            is_sidechain: self.parent_agent_id.is_some(),
            timestamp,
            agent_id: self.parent_agent_id.clone(),
            version: self.version.clone(),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn overwrite(target: &mut String, value: Option<&Value>) {
    if let Some(s) = non_empty_str(value) {
        *target = s.to_string();
    }
}

fn overwrite_opt(target: &mut Option<String>, value: Option<&Value>) {
    if let Some(s) = non_empty_str(value) {
        *target = Some(s.to_string());
    }
}

/// One step of conversion output, in source order.
enum Converted<'a> {
    Entry(CanonicalEntry),
    Passthrough(&'a str),
}

/// Stateless converter; all per-file state lives in a [`SessionContext`] created per call.
#[derive(Debug, Clone, Default)]
pub struct CodexConverter {
    meta_filter: MetaFilter,
}

impl CodexConverter {
    pub fn new(meta_filter: MetaFilter) -> Self {
        Self { meta_filter }
    }

    /// Convert a rollout file's text into canonical JSONL text.
    ///
    /// Returns `raw` unchanged when no canonical entry could be produced.
    pub fn convert(&self, raw: &str) -> String {
        let converted = self.convert_lines(raw);
        if !converted.iter().any(|c| matches!(c, Converted::Entry(_))) {
            return raw.to_string();
        }

        let mut lines = Vec::with_capacity(converted.len());
        for item in converted {
            match item {
                Converted::Entry(entry) => match entry.to_json_line() {
                    Ok(line) => lines.push(line),
                    Err(e) => debug!(error = %e, "failed to serialize converted entry"),
                },
                Converted::Passthrough(line) => lines.push(line.to_string()),
            }
        }
        lines.join("\n")
    }

    /// Convert a rollout file's text into canonical entries, dropping uninterpretable lines.
    pub fn convert_entries(&self, raw: &str) -> Vec<CanonicalEntry> {
        self.convert_lines(raw)
            .into_iter()
            .filter_map(|c| match c {
                Converted::Entry(entry) => Some(entry),
                Converted::Passthrough(_) => None,
            })
            .collect()
    }

    fn convert_lines<'a>(&self, raw: &'a str) -> Vec<Converted<'a>> {
        let records: Vec<Result<CodexRecord, &str>> = raw
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<CodexRecord>(line).map_err(|_| line))
            .collect();

        // Event-style messages mirror response items; only fall back to them when needed
        let use_events = !records.iter().flatten().any(|r| {
            r.record_type == "response_item"
                && r.payload.get("type").and_then(Value::as_str) == Some("message")
        });

        let mut context = SessionContext::default();
        let mut out = Vec::new();

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(line) => {
                    debug!("passing through line that is not a Codex record");
                    out.push(Converted::Passthrough(line));
                    continue;
                }
            };
            let timestamp =
                record.timestamp.as_deref().and_then(|t| t.parse::<DateTime<Utc>>().ok());

            match record.record_type.as_str() {
                "session_meta" => context.apply_session_meta(&record.payload),
                "turn_context" => context.apply_turn_context(&record.payload),
                "response_item" => {
                    for entry in self.convert_response_item(&record.payload, &context, timestamp) {
                        out.push(Converted::Entry(entry));
                    }
                }
                "event_msg" if use_events => {
                    if let Some(entry) = self.convert_event(&record.payload, &context, timestamp) {
                        out.push(Converted::Entry(entry));
                    }
                }
                "event_msg" | "compacted" => {}
                other => debug!(record_type = other, "skipping Codex record type"),
            }
        }

        out
    }

    fn convert_response_item(
        &self,
        payload: &Value,
        context: &SessionContext,
        timestamp: Option<DateTime<Utc>>,
    ) -> Vec<CanonicalEntry> {
        let item_type = payload.get("type").and_then(Value::as_str).unwrap_or("");

        match item_type {
            "message" => self.convert_message(payload, context, timestamp).into_iter().collect(),
            "reasoning" => {
                let thinking = reasoning_summary(payload);
                if thinking.is_empty() {
                    return Vec::new();
                }
                vec![assistant_entry(
                    context,
                    timestamp,
                    vec![AssistantContent::Thinking { thinking, signature: None }],
                )]
            }
            "function_call" | "custom_tool_call" | "local_shell_call" => {
                let name = match item_type {
                    "local_shell_call" => "local_shell",
                    _ => non_empty_str(payload.get("name")).unwrap_or("unknown"),
                };
                let input = match item_type {
                    "local_shell_call" => payload.get("action").cloned().unwrap_or(json!({})),
                    _ => parse_tool_input(payload.get("arguments").or_else(|| payload.get("input"))),
                };
                vec![assistant_entry(
                    context,
                    timestamp,
                    vec![AssistantContent::ToolUse {
                        id: call_id(payload),
                        name: name.to_string(),
                        input,
                    }],
                )]
            }
            "function_call_output" | "custom_tool_call_output" => {
                let (content, is_error) = unwrap_tool_output(payload.get("output"));
                vec![user_entry(
                    context,
                    timestamp,
                    vec![UserContent::ToolResult { tool_use_id: call_id(payload), content, is_error }],
                    false,
                )]
            }
            "web_search_call" => {
                // Codex logs the search once with its status; synthesize both halves
                let id = non_empty_str(payload.get("id"))
                    .map(str::to_string)
                    .unwrap_or_else(generate_call_id);
                let input = match payload.pointer("/action/query").and_then(Value::as_str) {
                    Some(query) => json!({ "query": query }),
                    None => payload.get("action").cloned().unwrap_or(json!({})),
                };
                let status = non_empty_str(payload.get("status")).unwrap_or("unknown");
                vec![
                    assistant_entry(
                        context,
                        timestamp,
                        vec![AssistantContent::ToolUse {
                            id: id.clone(),
                            name: "web_search".to_string(),
                            input,
                        }],
                    ),
                    user_entry(
                        context,
                        timestamp,
                        vec![UserContent::ToolResult {
                            tool_use_id: id,
                            content: Value::from(status),
                            is_error: Some(status == "failed"),
                        }],
                        false,
                    ),
                ]
            }
            other => {
                debug!(item_type = other, "skipping Codex response_item type");
                Vec::new()
            }
        }
    }

    fn convert_message(
        &self,
        payload: &Value,
        context: &SessionContext,
        timestamp: Option<DateTime<Utc>>,
    ) -> Option<CanonicalEntry> {
        let role = payload.get("role").and_then(Value::as_str).unwrap_or("");
        let content = payload.get("content");
        let text = message_text(content);

        match role {
            "assistant" => {
                if text.is_empty() {
                    return None;
                }
                Some(assistant_entry(context, timestamp, vec![AssistantContent::Text { text }]))
            }
            "user" => {
                let images = message_images(content);
                if text.is_empty() && images.is_empty() {
                    return None;
                }
                let is_meta = !text.is_empty() && self.meta_filter.is_meta(&text);
                let mut blocks = Vec::with_capacity(images.len() + 1);
                if !text.is_empty() {
                    blocks.push(UserContent::Text { text });
                }
                blocks.extend(images);
                Some(user_entry(context, timestamp, blocks, is_meta))
            }
            "developer" | "system" => {
                if text.is_empty() {
                    return None;
                }
                Some(CanonicalEntry::System(SystemEntry {
                    meta: context.entry_meta(timestamp),
                    content: text,
                    level: SystemLevel::Info,
                    subtype: Some(role.to_string()),
                    is_meta: true,
                }))
            }
            other => {
                debug!(role = other, "skipping Codex message with unknown role");
                None
            }
        }
    }

    fn convert_event(
        &self,
        payload: &Value,
        context: &SessionContext,
        timestamp: Option<DateTime<Utc>>,
    ) -> Option<CanonicalEntry> {
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");

        match event_type {
            "user_message" => {
                let text = trimmed_text(payload.get("message"))?;
                let is_meta = self.meta_filter.is_meta(&text);
                Some(user_entry(context, timestamp, vec![UserContent::Text { text }], is_meta))
            }
            "agent_message" => {
                let text = trimmed_text(payload.get("message"))?;
                Some(assistant_entry(context, timestamp, vec![AssistantContent::Text { text }]))
            }
            "agent_reasoning" => {
                let thinking = trimmed_text(payload.get("text"))?;
                Some(assistant_entry(
                    context,
                    timestamp,
                    vec![AssistantContent::Thinking { thinking, signature: None }],
                ))
            }
            _ => None,
        }
    }
}

/// Convert with the default meta-content patterns.
pub fn convert_codex_text(raw: &str) -> String {
    CodexConverter::default().convert(raw)
}

fn user_entry(
    context: &SessionContext,
    timestamp: Option<DateTime<Utc>>,
    content: Vec<UserContent>,
    is_meta: bool,
) -> CanonicalEntry {
    CanonicalEntry::User(UserEntry {
        meta: context.entry_meta(timestamp),
        message: Message {
            role: "user".to_string(),
            content: MessageBody::Blocks(content),
            model: None,
            id: None,
        },
        is_meta,
        tool_use_result: None,
    })
}

fn assistant_entry(
    context: &SessionContext,
    timestamp: Option<DateTime<Utc>>,
    content: Vec<AssistantContent>,
) -> CanonicalEntry {
    CanonicalEntry::Assistant(AssistantEntry {
        meta: context.entry_meta(timestamp),
        message: Message {
            role: "assistant".to_string(),
            content: MessageBody::Blocks(content),
            model: context.model.clone(),
            id: None,
        },
    })
}

fn trimmed_text(value: Option<&Value>) -> Option<String> {
    let text = value.and_then(Value::as_str)?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Join the text parts of a message's content (string or array of typed parts).
fn message_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| {
                matches!(
                    item.get("type").and_then(Value::as_str),
                    Some("input_text" | "output_text" | "text")
                )
            })
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

fn message_images(content: Option<&Value>) -> Vec<UserContent> {
    let Some(Value::Array(items)) = content else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("input_image"))
        .filter_map(|item| item.get("image_url").and_then(Value::as_str))
        .map(|url| UserContent::Image { source: image_source(url) })
        .collect()
}

/// `data:image/png;base64,AAAA` becomes a base64 source, anything else a url source.
fn image_source(url: &str) -> Value {
    if let Some(rest) = url.strip_prefix("data:")
        && let Some((header, data)) = rest.split_once(',')
        && let Some(media_type) = header.strip_suffix(";base64")
    {
        return json!({ "type": "base64", "media_type": media_type, "data": data });
    }
    json!({ "type": "url", "url": url })
}

fn reasoning_summary(payload: &Value) -> String {
    payload
        .get("summary")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn generate_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

fn call_id(payload: &Value) -> String {
    non_empty_str(payload.get("call_id")).map(str::to_string).unwrap_or_else(generate_call_id)
}

/// Tool arguments arrive as a JSON-encoded string; free-form input is wrapped.
fn parse_tool_input(arguments: Option<&Value>) -> Value {
    match arguments {
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => json!({ "input": s }),
        },
        Some(Value::Null) | None => json!({}),
        Some(other) => other.clone(),
    }
}

/// Unwrap `{"output": ..., "metadata": {"exit_code": n}}` envelopes.
fn unwrap_tool_output(output: Option<&Value>) -> (Value, Option<bool>) {
    let parsed = match output {
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(envelope @ Value::Object(_)) => envelope,
            _ => return (Value::String(s.clone()), None),
        },
        Some(other) => other.clone(),
        None => return (Value::Null, None),
    };

    match parsed.get("output") {
        Some(inner) => {
            let is_error = parsed
                .pointer("/metadata/exit_code")
                .and_then(Value::as_i64)
                .map(|code| code != 0);
            (inner.clone(), is_error)
        }
        None => (parsed, None),
    }
}
