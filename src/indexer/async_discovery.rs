//! Non-blocking scan with the same output as [`crate::indexer::discovery`].
//!
//! Roots are scanned concurrently, as are the group directories of a Claude root and the
//! head reads of Codex files.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::StoreRoot;
use crate::indexer::discovery::{
    GROUP_SNIFF_LINES, PROVIDER_SNIFF_LINES, file_record, group_from_head, has_session_extension,
    log_scan_summary, tag_from_head,
};
use crate::indexer::merge::merge_files;
use crate::models::{ConversationFile, GroupMap, Provider};
use crate::utils::files::{MIN_FILE_SIZE, read_head_lines_async};
use crate::utils::paths::resolve_path_async;

/// Async [`scan_roots`](crate::indexer::discovery::scan_roots)
pub async fn scan_roots_async(roots: &[StoreRoot]) -> GroupMap {
    let per_root = join_all(roots.iter().map(scan_root_async)).await;

    let mut groups = GroupMap::new();
    for files in per_root {
        merge_files(&mut groups, files);
    }
    log_scan_summary(roots.len(), &groups);
    groups
}

pub async fn scan_root_async(root: &StoreRoot) -> Vec<ConversationFile> {
    let root = &StoreRoot { path: resolve_path_async(&root.path).await, ..root.clone() };
    let is_dir = fs::metadata(&root.path).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        debug!(path = %root.path.display(), "Skipping missing root");
        return Vec::new();
    }

    match root.provider {
        Provider::Claude => scan_claude_root_async(root).await,
        Provider::Codex => scan_codex_root_async(root).await,
    }
}

/// Entries of `dir` with their (non-followed) file types; `None` if unreadable
async fn list_dir(dir: &Path) -> Option<Vec<(PathBuf, std::fs::FileType)>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to read directory");
            return None;
        }
    };

    let mut listed = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => match entry.file_type().await {
                Ok(file_type) => listed.push((entry.path(), file_type)),
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to stat entry"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                break;
            }
        }
    }
    Some(listed)
}

async fn scan_claude_root_async(root: &StoreRoot) -> Vec<ConversationFile> {
    let Some(entries) = list_dir(&root.path).await else {
        return Vec::new();
    };

    let group_dirs = entries.into_iter().filter(|(_, file_type)| file_type.is_dir());
    let per_group = join_all(group_dirs.map(|(dir, _)| scan_group_dir_async(dir, root))).await;
    per_group.into_iter().flatten().collect()
}

async fn scan_group_dir_async(dir: PathBuf, root: &StoreRoot) -> Vec<ConversationFile> {
    let Some(group) = dir.file_name().map(|name| name.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let Some(entries) = list_dir(&dir).await else {
        return Vec::new();
    };

    let mut files = Vec::new();
    for (path, _) in entries {
        if !has_session_extension(&path) {
            continue;
        }
        let metadata = match fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat session file");
                continue;
            }
        };
        if let Some(mut file) = file_record(&path, group.clone(), &metadata, root) {
            tag_from_head(&mut file, read_head_lines_async(&path, PROVIDER_SNIFF_LINES).await);
            files.push(file);
        }
    }
    files
}

async fn scan_codex_root_async(root: &StoreRoot) -> Vec<ConversationFile> {
    // Depth-first walk without following symlinks
    let mut candidates = Vec::new();
    let mut stack = vec![root.path.clone()];
    while let Some(dir) = stack.pop() {
        let Some(entries) = list_dir(&dir).await else {
            continue;
        };
        for (path, file_type) in entries {
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && has_session_extension(&path) {
                candidates.push(path);
            }
        }
    }

    let records = join_all(candidates.into_iter().map(|path| codex_file_record(path, root))).await;
    records.into_iter().flatten().collect()
}

async fn codex_file_record(path: PathBuf, root: &StoreRoot) -> Option<ConversationFile> {
    let metadata = match fs::symlink_metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to stat session file");
            return None;
        }
    };
    if metadata.len() < MIN_FILE_SIZE {
        return None;
    }

    let group = match read_head_lines_async(&path, GROUP_SNIFF_LINES).await {
        Ok(lines) => group_from_head(&lines),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read session head");
            return None;
        }
    };
    file_record(&path, group, &metadata, root)
}
