use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which tool produced a session file.
///
/// `Claude` logs are already in the canonical schema; `Codex` rollouts need conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    Codex,
}

impl Provider {
    pub fn is_foreign(self) -> bool {
        matches!(self, Provider::Codex)
    }
}

/// One session file found during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationFile {
    pub name: String,
    pub path: PathBuf,
    pub group: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub profile: Option<String>,
    pub provider: Option<Provider>,
    /// First meaningful user message, `None` until loaded.
    pub preview: Option<String>,
    pub preview_attempted: bool,
}

/// Group key -> files, each list newest first.
pub type GroupMap = BTreeMap<String, Vec<ConversationFile>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub label: String,
    pub file_count: usize,
    pub latest_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupScope {
    One(String),
    All,
}
