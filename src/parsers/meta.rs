//! Recognition of boilerplate user content (command envelopes, instruction banners,
//! tool-result echoes, caveats).
//!
//! The pattern lists are configuration: new tool versions introduce new envelopes, so the
//! defaults are a best effort, not a complete list.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

const DEFAULT_PREFIXES: &[&str] = &[
    "<command-name>",
    "<command-message>",
    "<command-args>",
    "<local-command-stdout>",
    "<local-command-stderr>",
    "<local-command-caveat>",
    "Caveat: The messages below were generated by the user while running local commands",
    "<environment_context>",
    "<user_instructions>",
    "<INSTRUCTIONS>",
    "# AGENTS.md instructions",
    "<system-reminder>",
    "<tool_result>",
    "<tool-result>",
    "<user-prompt-submit-hook>",
    "[Request interrupted by user",
];

const DEFAULT_MARKERS: &[&str] =
    &["<local-command-caveat>", "<environment_context>", "<user_instructions>"];

static DEFAULT_FILTER: LazyLock<MetaFilter> = LazyLock::new(MetaFilter::default);

/// Prefix and substring patterns marking a user message as meta content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFilter {
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub markers: Vec<String>,
}

impl Default for MetaFilter {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
            markers: DEFAULT_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MetaFilter {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// True when `text` starts with a known prefix (ignoring leading whitespace) or contains
    /// a known marker anywhere.
    pub fn is_meta(&self, text: &str) -> bool {
        let trimmed = text.trim_start();
        self.prefixes.iter().any(|p| trimmed.starts_with(p.as_str()))
            || self.markers.iter().any(|m| trimmed.contains(m.as_str()))
    }
}

/// [`MetaFilter::is_meta`] with the default patterns.
pub fn is_meta_content(text: &str) -> bool {
    DEFAULT_FILTER.is_meta(text)
}
