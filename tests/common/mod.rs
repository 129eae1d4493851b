//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use session_ingest::{Provider, StoreConfig, StoreRoot};
use tempfile::TempDir;

/// Minimum size every fixture session is padded to, above the discovery threshold
pub const PADDED_SIZE: usize = 1100;

/// Builder for a temporary home directory with Claude and Codex stores
pub struct StoreBuilder {
    home: TempDir,
}

impl StoreBuilder {
    /// Create a home directory with empty default roots
    pub fn new() -> Self {
        let home = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(home.path().join(".claude/projects")).expect("Failed to create projects");
        fs::create_dir_all(home.path().join(".codex/sessions")).expect("Failed to create sessions");
        Self { home }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn claude_root(&self) -> PathBuf {
        self.home.path().join(".claude/projects")
    }

    pub fn codex_root(&self) -> PathBuf {
        self.home.path().join(".codex/sessions")
    }

    pub fn claude_path(&self, group: &str, name: &str) -> PathBuf {
        self.claude_root().join(group).join(name)
    }

    /// Path of a Codex rollout under `YYYY/MM/DD`
    pub fn codex_path(&self, date: &str, name: &str) -> PathBuf {
        self.codex_root().join(date).join(name)
    }

    /// Add a Claude session made of `lines`, padded past the size threshold
    pub fn with_claude_session(self, group: &str, name: &str, lines: &[Value]) -> Self {
        write_session(&self.claude_path(group, name), lines);
        self
    }

    /// Add a Codex rollout made of `lines`, padded past the size threshold
    pub fn with_codex_session(self, date: &str, name: &str, lines: &[Value]) -> Self {
        write_session(&self.codex_path(date, name), lines);
        self
    }

    /// Add a Claude session under `~/.claude-<profile>/projects`
    pub fn with_profile_session(self, profile: &str, group: &str, name: &str, lines: &[Value]) -> Self {
        let path = self.home.path().join(format!(".claude-{profile}/projects")).join(group).join(name);
        write_session(&path, lines);
        self
    }

    /// Add a file with exact contents, relative to the home directory
    pub fn with_raw_file(self, relative: &str, contents: &[u8]) -> Self {
        let path = self.home.path().join(relative);
        fs::create_dir_all(path.parent().expect("relative path has a parent"))
            .expect("Failed to create parent dir");
        fs::write(path, contents).expect("Failed to write file");
        self
    }

    /// Config pointing at this home, independent of the real environment
    pub fn config(&self) -> StoreConfig {
        let mut config = StoreConfig::default()
            .with_root(StoreRoot::new(self.claude_root(), Provider::Claude))
            .with_root(StoreRoot::new(self.codex_root(), Provider::Codex));
        config.roots.extend(session_ingest::utils::discover_profile_roots(self.home.path()));
        config
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `lines` as JSONL followed by a whitespace-only padding line
pub fn write_session(path: &Path, lines: &[Value]) {
    fs::create_dir_all(path.parent().expect("session path has a parent"))
        .expect("Failed to create session dir");
    let mut body: String = lines.iter().map(|line| format!("{line}\n")).collect();
    let padding = PADDED_SIZE.saturating_sub(body.len()).max(1);
    body.push_str(&" ".repeat(padding));
    body.push('\n');
    fs::write(path, body).expect("Failed to write session");
}

/// Set a file's modification time to `secs` after the epoch
pub fn set_mtime(path: &Path, secs: u64) {
    let time = std::time::UNIX_EPOCH + std::time::Duration::from_secs(secs);
    let file = fs::File::options().write(true).open(path).expect("Failed to open file");
    file.set_modified(time).expect("Failed to set mtime");
}

pub fn claude_user(text: &str) -> Value {
    json!({
        "type": "user",
        "uuid": "u-1",
        "sessionId": "s-1",
        "cwd": "/repo/app",
        "parentUuid": null,
        "isSidechain": false,
        "timestamp": "2026-02-03T10:00:00Z",
        "message": { "role": "user", "content": text }
    })
}

pub fn claude_tool_use(id: &str, name: &str) -> Value {
    json!({
        "type": "assistant",
        "uuid": "a-1",
        "sessionId": "s-1",
        "message": {
            "role": "assistant",
            "content": [{ "type": "tool_use", "id": id, "name": name, "input": {} }]
        }
    })
}

pub fn claude_tool_result(id: &str, content: &str) -> Value {
    json!({
        "type": "user",
        "uuid": "u-2",
        "sessionId": "s-1",
        "message": {
            "role": "user",
            "content": [{ "type": "tool_result", "tool_use_id": id, "content": content }]
        }
    })
}

pub fn codex_session_meta(id: &str, cwd: &str) -> Value {
    json!({
        "timestamp": "2026-02-03T10:00:00.000Z",
        "type": "session_meta",
        "payload": { "id": id, "cwd": cwd, "cli_version": "0.46.0" }
    })
}

pub fn codex_user_message(text: &str) -> Value {
    json!({
        "timestamp": "2026-02-03T10:00:01.000Z",
        "type": "response_item",
        "payload": {
            "type": "message",
            "role": "user",
            "content": [{ "type": "input_text", "text": text }]
        }
    })
}

pub fn codex_assistant_message(text: &str) -> Value {
    json!({
        "timestamp": "2026-02-03T10:00:02.000Z",
        "type": "response_item",
        "payload": {
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "output_text", "text": text }]
        }
    })
}

pub fn codex_function_call(call_id: &str, name: &str, arguments: &str) -> Value {
    json!({
        "type": "response_item",
        "payload": { "type": "function_call", "name": name, "arguments": arguments, "call_id": call_id }
    })
}

pub fn codex_function_output(call_id: &str, output: &str) -> Value {
    json!({
        "type": "response_item",
        "payload": { "type": "function_call_output", "call_id": call_id, "output": output }
    })
}
