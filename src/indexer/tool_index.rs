//! Tool invocation/result correlation over one conversation.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::{AssistantContent, CanonicalEntry, MessageBody, UserContent};

/// Name reported for a result whose invocation was never seen
pub const UNKNOWN_TOOL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCorrelation {
    pub name: String,
    pub result: Value,
    pub is_error: bool,
}

/// Map each tool-use id that has a result to the invocation name and result payload.
///
/// Built in two passes: invocation names first, then results. Results are never dropped;
/// an id with no matching invocation gets [`UNKNOWN_TOOL`] as its name. If an id has
/// several results the last one wins.
pub fn build_tool_index(entries: &[CanonicalEntry]) -> HashMap<String, ToolCorrelation> {
    let names = invocation_names(entries);

    let mut index = HashMap::new();
    for entry in entries {
        let CanonicalEntry::User(user) = entry else {
            continue;
        };
        let MessageBody::Blocks(items) = &user.message.content else {
            continue;
        };

        for item in items {
            if let UserContent::ToolResult { tool_use_id, content, is_error } = item {
                let name = names.get(tool_use_id.as_str()).copied().unwrap_or(UNKNOWN_TOOL);
                index.insert(
                    tool_use_id.clone(),
                    ToolCorrelation {
                        name: name.to_string(),
                        result: content.clone(),
                        is_error: is_error.unwrap_or(false),
                    },
                );
            }
        }
    }
    index
}

fn invocation_names(entries: &[CanonicalEntry]) -> HashMap<&str, &str> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            CanonicalEntry::Assistant(assistant) => match &assistant.message.content {
                MessageBody::Blocks(items) => Some(items),
                MessageBody::Text(_) => None,
            },
            _ => None,
        })
        .flatten()
        .filter_map(|item| match item {
            AssistantContent::ToolUse { id, name, .. } => Some((id.as_str(), name.as_str())),
            _ => None,
        })
        .collect()
}
