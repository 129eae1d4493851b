use std::fs::{self, Metadata};
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StoreRoot;
use crate::indexer::merge::merge_files;
use crate::models::{ConversationFile, GroupMap, Provider};
use crate::parsers::classify_content;
use crate::utils::files::{MIN_FILE_SIZE, read_head_lines};
use crate::utils::paths::{group_key_for_cwd, resolve_path};

/// Lines read from the top of a Codex file when looking for its working directory
pub const GROUP_SNIFF_LINES: usize = 50;

/// Lines read from the top of a file under a Claude root to spot copied Codex rollouts
pub const PROVIDER_SNIFF_LINES: usize = 4;

const SESSION_EXTENSION: &str = "jsonl";

/// Scan every root and merge the results into one group map
///
/// Missing roots are skipped. Unreadable directories and files are logged as warnings and
/// skipped; a scan never fails as a whole. Each group is sorted newest first.
///
/// # Examples
///
/// ```no_run
/// use session_ingest::{StoreConfig, scan_roots};
///
/// let config = StoreConfig::from_env()?;
/// let groups = scan_roots(&config.roots);
/// println!("Found {} groups", groups.len());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn scan_roots(roots: &[StoreRoot]) -> GroupMap {
    let mut groups = GroupMap::new();
    for root in roots {
        merge_files(&mut groups, scan_root(root));
    }
    log_scan_summary(roots.len(), &groups);
    groups
}

/// Discover the session files under a single root
///
/// The root is resolved to its absolute, symlink-free form first, so file paths do not
/// depend on how the root was spelled.
pub fn scan_root(root: &StoreRoot) -> Vec<ConversationFile> {
    let root = StoreRoot { path: resolve_path(&root.path), ..root.clone() };
    if !root.path.is_dir() {
        debug!(path = %root.path.display(), "Skipping missing root");
        return Vec::new();
    }

    match root.provider {
        Provider::Claude => scan_claude_root(&root),
        Provider::Codex => scan_codex_root(&root),
    }
}

/// `<root>/<group>/<session>.jsonl`, where the group directory name is the key
fn scan_claude_root(root: &StoreRoot) -> Vec<ConversationFile> {
    let entries = match fs::read_dir(&root.path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.path.display(), error = %e, "Failed to read root directory");
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %root.path.display(), error = %e, "Failed to read directory entry");
                continue;
            }
        };

        // file_type() does not follow symlinks, so linked group dirs are skipped here
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to stat entry");
                continue;
            }
        }

        let group = entry.file_name().to_string_lossy().into_owned();
        let group_dir = entry.path();
        let sessions = match fs::read_dir(&group_dir) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(path = %group_dir.display(), error = %e, "Failed to read group directory");
                continue;
            }
        };

        for session in sessions {
            let path = match session {
                Ok(session) => session.path(),
                Err(e) => {
                    warn!(path = %group_dir.display(), error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            if !has_session_extension(&path) {
                continue;
            }
            // symlink_metadata keeps linked files out
            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to stat session file");
                    continue;
                }
            };
            if let Some(mut file) = file_record(&path, group.clone(), &metadata, root) {
                tag_from_head(&mut file, read_head_lines(&path, PROVIDER_SNIFF_LINES));
                files.push(file);
            }
        }
    }
    files
}

/// Nested date directories; the group comes from the file's recorded cwd
fn scan_codex_root(root: &StoreRoot) -> Vec<ConversationFile> {
    let mut files = Vec::new();
    for entry in WalkDir::new(&root.path).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable path under Codex root");
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_session_extension(entry.path()) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to stat session file");
                continue;
            }
        };
        if metadata.len() < MIN_FILE_SIZE {
            continue;
        }

        let group = match read_head_lines(entry.path(), GROUP_SNIFF_LINES) {
            Ok(lines) => group_from_head(&lines),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to read session head");
                continue;
            }
        };
        if let Some(file) = file_record(entry.path(), group, &metadata, root) {
            files.push(file);
        }
    }
    files
}

pub(crate) fn has_session_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SESSION_EXTENSION)
}

/// Group key from the first `session_meta` or `turn_context` record carrying a cwd
pub fn group_from_head(lines: &[String]) -> String {
    let cwd = lines.iter().find_map(|line| {
        let value: Value = serde_json::from_str(line).ok()?;
        match value.get("type").and_then(Value::as_str) {
            Some("session_meta" | "turn_context") => value
                .pointer("/payload/cwd")
                .and_then(Value::as_str)
                .filter(|cwd| !cwd.trim().is_empty())
                .map(str::to_string),
            _ => None,
        }
    });
    group_key_for_cwd(cwd.as_deref())
}

/// Re-tag a file found under a Claude root by what its first lines contain
///
/// An unreadable head keeps the root's provider.
pub(crate) fn tag_from_head(file: &mut ConversationFile, head: Result<Vec<String>>) {
    match head {
        Ok(lines) => file.provider = Some(classify_content(&lines.join("\n"))),
        Err(e) => warn!(path = %file.path.display(), error = %e, "Failed to read session head"),
    }
}

/// Build a file record, or `None` for non-regular or undersized files
pub(crate) fn file_record(
    path: &Path,
    group: String,
    metadata: &Metadata,
    root: &StoreRoot,
) -> Option<ConversationFile> {
    if !metadata.file_type().is_file() || metadata.len() < MIN_FILE_SIZE {
        return None;
    }

    let modified = match metadata.modified() {
        Ok(time) => DateTime::<Utc>::from(time),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Missing modification time");
            return None;
        }
    };

    Some(ConversationFile {
        name: path.file_name()?.to_string_lossy().into_owned(),
        path: path.to_path_buf(),
        group,
        size: metadata.len(),
        modified,
        profile: root.profile.clone(),
        provider: Some(root.provider),
        preview: None,
        preview_attempted: false,
    })
}

pub(crate) fn log_scan_summary(roots: usize, groups: &GroupMap) {
    let files: usize = groups.values().map(Vec::len).sum();
    info!(roots, groups = groups.len(), files, "Scan complete");
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::utils::paths::UNKNOWN_GROUP;

    fn write_sized(path: &Path, size: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; size]).unwrap();
    }

    #[test]
    fn test_claude_root_layout() {
        let temp = TempDir::new().unwrap();
        write_sized(&temp.path().join("-repo-app/a.jsonl"), 2048);
        write_sized(&temp.path().join("-repo-app/notes.txt"), 2048);
        write_sized(&temp.path().join("-repo-lib/b.jsonl"), 1024);
        write_sized(&temp.path().join("stray.jsonl"), 2048);

        let root = StoreRoot::new(temp.path(), Provider::Claude).with_profile("work");
        let mut files = scan_root(&root);
        files.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].group, "-repo-app");
        assert_eq!(files[0].size, 2048);
        assert_eq!(files[0].profile.as_deref(), Some("work"));
        assert_eq!(files[0].provider, Some(Provider::Claude));
        assert!(files[0].preview.is_none());
        assert_eq!(files[1].group, "-repo-lib");
    }

    #[test]
    fn test_size_threshold() {
        let temp = TempDir::new().unwrap();
        write_sized(&temp.path().join("g/small.jsonl"), MIN_FILE_SIZE as usize - 1);
        write_sized(&temp.path().join("g/exact.jsonl"), MIN_FILE_SIZE as usize);

        let files = scan_root(&StoreRoot::new(temp.path(), Provider::Claude));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "exact.jsonl");
    }

    #[test]
    fn test_missing_root_is_empty() {
        let root = StoreRoot::new("/nonexistent/projects", Provider::Claude);
        assert!(scan_root(&root).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        write_sized(&outside.path().join("linked/x.jsonl"), 2048);
        write_sized(&outside.path().join("target.jsonl"), 2048);
        fs::create_dir_all(temp.path().join("g")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("linked"), temp.path().join("linked"))
            .unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("target.jsonl"),
            temp.path().join("g/link.jsonl"),
        )
        .unwrap();

        assert!(scan_root(&StoreRoot::new(temp.path(), Provider::Claude)).is_empty());
    }

    #[test]
    fn test_codex_group_from_cwd() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("2026/02/03/rollout-a.jsonl");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let head = r#"{"type":"session_meta","payload":{"id":"s1","cwd":"/repo/app"}}"#;
        fs::write(&path, format!("{head}\n{}", " ".repeat(2048))).unwrap();

        let files = scan_root(&StoreRoot::new(temp.path(), Provider::Codex));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].group, "-repo-app");
        assert_eq!(files[0].provider, Some(Provider::Codex));
    }

    #[test]
    fn test_group_from_head() {
        let lines = vec![
            "not json".to_string(),
            r#"{"type":"response_item","payload":{"cwd":"/ignored"}}"#.to_string(),
            r#"{"type":"turn_context","payload":{"cwd":"/work/site"}}"#.to_string(),
        ];
        assert_eq!(group_from_head(&lines), "-work-site");
        assert_eq!(group_from_head(&[]), UNKNOWN_GROUP);
        assert_eq!(
            group_from_head(&[r#"{"type":"session_meta","payload":{"cwd":""}}"#.to_string()]),
            UNKNOWN_GROUP
        );
    }

    #[test]
    fn test_codex_rollout_under_claude_root_is_retagged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("-repo/copied.jsonl");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let head = r#"{"type":"session_meta","payload":{"id":"s1","cwd":"/repo"}}"#;
        fs::write(&path, format!("{head}\n{}", " ".repeat(2048))).unwrap();
        write_sized(&temp.path().join("-repo/plain.jsonl"), 2048);

        let mut files = scan_root(&StoreRoot::new(temp.path(), Provider::Claude));
        files.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "copied.jsonl");
        assert_eq!(files[0].group, "-repo");
        assert_eq!(files[0].provider, Some(Provider::Codex));
        assert_eq!(files[1].provider, Some(Provider::Claude));
    }

    #[test]
    fn test_root_spellings_do_not_duplicate() {
        let temp = TempDir::new().unwrap();
        write_sized(&temp.path().join("g/a.jsonl"), 2048);

        let plain = StoreRoot::new(temp.path(), Provider::Claude);
        let dotted = StoreRoot::new(temp.path().join("g").join(".."), Provider::Claude);
        let groups = scan_roots(&[plain, dotted]);
        assert_eq!(groups["g"].len(), 1);
        assert!(groups["g"][0].path.is_absolute());
        assert_eq!(groups["g"][0].path, resolve_path(&temp.path().join("g/a.jsonl")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_root_spelling_does_not_duplicate() {
        let temp = TempDir::new().unwrap();
        let links = TempDir::new().unwrap();
        write_sized(&temp.path().join("g/a.jsonl"), 2048);
        let alias = links.path().join("projects");
        std::os::unix::fs::symlink(temp.path(), &alias).unwrap();

        let groups = scan_roots(&[
            StoreRoot::new(temp.path(), Provider::Claude),
            StoreRoot::new(&alias, Provider::Claude),
        ]);
        assert_eq!(groups["g"].len(), 1);
    }

    #[test]
    fn test_scan_roots_merges_and_sorts() {
        let temp = TempDir::new().unwrap();
        write_sized(&temp.path().join("g/a.jsonl"), 2048);

        // The same root twice must not duplicate files
        let root = StoreRoot::new(temp.path(), Provider::Claude);
        let groups = scan_roots(&[root.clone(), root]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["g"].len(), 1);
    }
}
