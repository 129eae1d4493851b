use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields shared by every non-error entry variant.
///
/// Everything is optional on input so that drifted records still validate; a missing
/// `parentUuid` is read as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMeta {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(
        default,
        deserialize_with = "crate::parsers::deserializers::deserialize_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Message body: either a bare string or a list of typed content items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody<T> {
    Text(String),
    Blocks(Vec<T>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<T> {
    #[serde(default)]
    pub role: String,
    pub content: MessageBody<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Content items allowed in a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContent {
    Text {
        text: String,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    Image {
        source: Value,
    },
    Document {
        source: Value,
    },
}

/// Content items allowed in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantContent {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    Image {
        source: Value,
    },
    Document {
        source: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    #[serde(flatten)]
    pub meta: EntryMeta,
    pub message: Message<UserContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_meta: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_result: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantEntry {
    #[serde(flatten)]
    pub meta: EntryMeta,
    pub message: Message<AssistantContent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemLevel {
    #[default]
    Info,
    Suggestion,
    Warning,
    Error,
}

impl SystemLevel {
    pub const ALL: [&'static str; 4] = ["info", "suggestion", "warning", "error"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemEntry {
    #[serde(flatten)]
    pub meta: EntryMeta,
    pub content: String,
    pub level: SystemLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_meta: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    #[serde(flatten)]
    pub meta: EntryMeta,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHistorySnapshotEntry {
    #[serde(flatten)]
    pub meta: EntryMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub snapshot: Value,
    #[serde(default)]
    pub is_snapshot_update: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOperationEntry {
    #[serde(flatten)]
    pub meta: EntryMeta,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// A line that failed validation, kept verbatim so it can still be shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub raw: String,
}

/// One event of a conversation in the canonical (Claude Code) schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CanonicalEntry {
    User(UserEntry),
    Assistant(AssistantEntry),
    Summary(SummaryEntry),
    System(SystemEntry),
    FileHistorySnapshot(FileHistorySnapshotEntry),
    QueueOperation(QueueOperationEntry),
    Error(ErrorEntry),
}

impl CanonicalEntry {
    /// Discriminator value as written in the `type` field.
    pub fn entry_type(&self) -> &'static str {
        match self {
            CanonicalEntry::User(_) => "user",
            CanonicalEntry::Assistant(_) => "assistant",
            CanonicalEntry::Summary(_) => "summary",
            CanonicalEntry::System(_) => "system",
            CanonicalEntry::FileHistorySnapshot(_) => "file-history-snapshot",
            CanonicalEntry::QueueOperation(_) => "queue-operation",
            CanonicalEntry::Error(_) => "error",
        }
    }

    pub fn meta(&self) -> Option<&EntryMeta> {
        match self {
            CanonicalEntry::User(e) => Some(&e.meta),
            CanonicalEntry::Assistant(e) => Some(&e.meta),
            CanonicalEntry::Summary(e) => Some(&e.meta),
            CanonicalEntry::System(e) => Some(&e.meta),
            CanonicalEntry::FileHistorySnapshot(e) => Some(&e.meta),
            CanonicalEntry::QueueOperation(e) => Some(&e.meta),
            CanonicalEntry::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CanonicalEntry::Error(_))
    }

    /// Serialize to one canonical JSON line.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_names_match_serialized_tag() {
        let entry = CanonicalEntry::QueueOperation(QueueOperationEntry {
            meta: EntryMeta::default(),
            operation: "enqueue".to_string(),
            content: None,
        });
        let json: Value = serde_json::from_str(&entry.to_json_line().unwrap()).unwrap();
        assert_eq!(json["type"], entry.entry_type());
    }

    #[test]
    fn test_missing_parent_serializes_as_null() {
        let entry = CanonicalEntry::Summary(SummaryEntry {
            meta: EntryMeta::default(),
            summary: "Refactor parser".to_string(),
            leaf_uuid: None,
        });
        let json: Value = serde_json::from_str(&entry.to_json_line().unwrap()).unwrap();
        assert!(json["parentUuid"].is_null());
        assert!(json.get("leafUuid").is_none());
    }

    #[test]
    fn test_error_entry_has_no_meta() {
        let entry = CanonicalEntry::Error(ErrorEntry { raw: "oops".to_string() });
        assert!(entry.is_error());
        assert!(entry.meta().is_none());
    }

    #[test]
    fn test_user_content_rejects_thinking_items() {
        let json = r#"{"role":"user","content":[{"type":"thinking","thinking":"hm"}]}"#;
        assert!(serde_json::from_str::<Message<UserContent>>(json).is_err());
    }

    #[test]
    fn test_message_body_accepts_plain_string() {
        let json = r#"{"role":"user","content":"hello"}"#;
        let message: Message<UserContent> = serde_json::from_str(json).unwrap();
        assert_eq!(message.content, MessageBody::Text("hello".to_string()));
    }
}
