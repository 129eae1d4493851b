use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::StoreRoot;
use crate::models::Provider;

/// Overrides the Claude Code config directory (`~/.claude`)
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";
/// Overrides the Codex home directory (`~/.codex`)
pub const CODEX_HOME_ENV: &str = "CODEX_HOME";

/// Get the user's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine home directory")
}

/// Claude Code projects root, honoring `CLAUDE_CONFIG_DIR`
pub fn claude_projects_dir(home: &Path) -> PathBuf {
    claude_projects_dir_internal(home, env::var_os(CLAUDE_CONFIG_DIR_ENV))
}

fn claude_projects_dir_internal(home: &Path, config_override: Option<OsString>) -> PathBuf {
    match config_override.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir).join("projects"),
        None => home.join(".claude").join("projects"),
    }
}

/// Codex sessions root, honoring `CODEX_HOME`
pub fn codex_sessions_dir(home: &Path) -> PathBuf {
    codex_sessions_dir_internal(home, env::var_os(CODEX_HOME_ENV))
}

fn codex_sessions_dir_internal(home: &Path, codex_home: Option<OsString>) -> PathBuf {
    match codex_home.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir).join("sessions"),
        None => home.join(".codex").join("sessions"),
    }
}

/// Find profile roots such as `~/.claude-work/projects` or `~/.codex-personal/sessions`
///
/// Only roots that exist are returned, sorted by path. An unreadable home directory
/// yields no profiles.
pub fn discover_profile_roots(home: &Path) -> Vec<StoreRoot> {
    let entries = match fs::read_dir(home) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %home.display(), error = %e, "Failed to list home directory");
            return Vec::new();
        }
    };

    let mut roots: Vec<StoreRoot> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let (provider, profile, subdir) =
                if let Some(profile) = name.strip_prefix(".claude-") {
                    (Provider::Claude, profile, "projects")
                } else if let Some(profile) = name.strip_prefix(".codex-") {
                    (Provider::Codex, profile, "sessions")
                } else {
                    return None;
                };
            if profile.is_empty() {
                return None;
            }

            let path = entry.path().join(subdir);
            path.is_dir().then(|| StoreRoot {
                path,
                provider,
                profile: Some(profile.to_string()),
            })
        })
        .collect();

    roots.sort_by(|a, b| a.path.cmp(&b.path));
    roots
}
