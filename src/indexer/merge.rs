use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::{ConversationFile, GroupMap};

/// Merge freshly discovered files into `groups`, keyed by absolute path
///
/// Known paths are replaced by the new record (size, mtime and group refreshed). A computed
/// preview survives only when the modification time is unchanged. Paths not seen in `found`
/// are kept, so merging is additive. Every group is re-sorted newest first.
pub fn merge_files(groups: &mut GroupMap, found: Vec<ConversationFile>) {
    let mut by_path: HashMap<PathBuf, ConversationFile> = std::mem::take(groups)
        .into_values()
        .flatten()
        .map(|file| (file.path.clone(), file))
        .collect();

    for mut file in found {
        if let Some(known) = by_path.get(&file.path)
            && known.modified == file.modified
            && !file.preview_attempted
        {
            file.preview = known.preview.clone();
            file.preview_attempted = known.preview_attempted;
        }
        by_path.insert(file.path.clone(), file);
    }

    for file in by_path.into_values() {
        groups.entry(file.group.clone()).or_default().push(file);
    }
    for files in groups.values_mut() {
        files.sort_by(newest_first);
    }
}

/// Newest modification time first; ties broken by path for a stable order
pub fn newest_first(a: &ConversationFile, b: &ConversationFile) -> Ordering {
    b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path))
}
