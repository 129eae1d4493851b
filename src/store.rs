//! The collaborator-facing conversation store.
//!
//! Holds one in-memory [`GroupMap`] built by scanning the configured roots. The map sits
//! behind a `RwLock` that is only held for short copy-in/copy-out sections and never across
//! an `.await`; file I/O and parsing always run outside it. A single [`AtomicBool`] turns a
//! rescan requested while another is in flight into a no-op.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use tracing::debug;

use crate::config::StoreConfig;
use crate::indexer::{load_previews, load_previews_async, merge_files, scan_roots, scan_roots_async};
use crate::models::{ConversationFile, GroupMap, GroupScope, GroupSummary, Provider};
use crate::parsers::{CodexConverter, classify};
use crate::utils::files::{MAX_READ_SIZE, ReadOutcome, read_bounded, read_bounded_async};
use crate::utils::paths::{group_label, resolve_path, resolve_path_async};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Completed,
    /// Another scan was in flight; nothing was done.
    AlreadyRunning,
}

/// Clears the in-flight flag when dropped, including on panic.
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Session files from every configured root, grouped by project
///
/// # Examples
///
/// ```no_run
/// use session_ingest::{ConversationStore, GroupScope, ReadOutcome, StoreConfig, parse_entries};
///
/// let store = ConversationStore::new(StoreConfig::from_env()?);
/// for file in store.list_files(&GroupScope::All) {
///     if let ReadOutcome::Content(text) = store.read_conversation(&file.path)? {
///         println!("{}: {} entries", file.name, parse_entries(&text).len());
///     }
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct ConversationStore {
    config: StoreConfig,
    /// Codex roots as configured and as resolved, so either spelling classifies by path
    codex_roots: Vec<PathBuf>,
    converter: CodexConverter,
    /// `None` until the first scan, and again after [`ConversationStore::clear_cache`]
    groups: RwLock<Option<GroupMap>>,
    scanning: AtomicBool,
}

impl ConversationStore {
    pub fn new(config: StoreConfig) -> Self {
        let mut codex_roots = config.codex_roots();
        let resolved: Vec<_> = codex_roots.iter().map(|root| resolve_path(root)).collect();
        codex_roots.extend(resolved);
        codex_roots.dedup();
        let converter = CodexConverter::new(config.meta_filter.clone());
        Self {
            config,
            codex_roots,
            converter,
            groups: RwLock::new(None),
            scanning: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn read_groups(&self) -> RwLockReadGuard<'_, Option<GroupMap>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_groups(&self) -> RwLockWriteGuard<'_, Option<GroupMap>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_scanned(&self) -> bool {
        self.read_groups().is_some()
    }

    fn apply_scan(&self, found: GroupMap) {
        let mut guard = self.write_groups();
        match guard.as_mut() {
            Some(groups) => merge_files(groups, found.into_values().flatten().collect()),
            None => *guard = Some(found),
        }
    }

    /// Scan all roots and merge the result into the current mapping.
    pub fn rescan(&self) -> ScanStatus {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            debug!("Scan already in flight, skipping");
            return ScanStatus::AlreadyRunning;
        };
        let found = scan_roots(&self.config.roots);
        self.apply_scan(found);
        ScanStatus::Completed
    }

    pub async fn rescan_async(&self) -> ScanStatus {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            debug!("Scan already in flight, skipping");
            return ScanStatus::AlreadyRunning;
        };
        let found = scan_roots_async(&self.config.roots).await;
        self.apply_scan(found);
        ScanStatus::Completed
    }

    /// Drop the mapping; the next listing rescans from scratch.
    pub fn clear_cache(&self) {
        *self.write_groups() = None;
    }

    fn ensure_scanned(&self) {
        if !self.is_scanned() {
            self.rescan();
        }
    }

    async fn ensure_scanned_async(&self) {
        if !self.is_scanned() {
            self.rescan_async().await;
        }
    }

    pub fn list_groups(&self) -> Vec<GroupSummary> {
        self.ensure_scanned();
        self.group_summaries()
    }

    pub async fn list_groups_async(&self) -> Vec<GroupSummary> {
        self.ensure_scanned_async().await;
        self.group_summaries()
    }

    fn group_summaries(&self) -> Vec<GroupSummary> {
        let guard = self.read_groups();
        let Some(groups) = guard.as_ref() else {
            return Vec::new();
        };
        groups
            .iter()
            .map(|(key, files)| GroupSummary {
                key: key.clone(),
                label: group_label(key),
                file_count: files.len(),
                latest_modified: files.iter().map(|f| f.modified).max(),
            })
            .collect()
    }

    /// Files of one group, or of all groups, newest first.
    pub fn list_files(&self, scope: &GroupScope) -> Vec<ConversationFile> {
        self.ensure_scanned();
        self.files_in_scope(scope)
    }

    pub async fn list_files_async(&self, scope: &GroupScope) -> Vec<ConversationFile> {
        self.ensure_scanned_async().await;
        self.files_in_scope(scope)
    }

    fn files_in_scope(&self, scope: &GroupScope) -> Vec<ConversationFile> {
        let guard = self.read_groups();
        let Some(groups) = guard.as_ref() else {
            return Vec::new();
        };
        match scope {
            GroupScope::One(key) => groups.get(key).cloned().unwrap_or_default(),
            GroupScope::All => {
                let mut files: Vec<_> = groups.values().flatten().cloned().collect();
                files.sort_by(crate::indexer::merge::newest_first);
                files
            }
        }
    }

    /// Copy of the record for `path`, if it is known.
    ///
    /// Records hold resolved paths; `path` may use any spelling of the same file.
    fn find_file(&self, path: &Path, resolved: &Path) -> Option<ConversationFile> {
        self.read_groups()
            .as_ref()?
            .values()
            .flatten()
            .find(|file| file.path == path || file.path == resolved)
            .cloned()
    }

    /// Write computed previews back, skipping records a concurrent caller already filled.
    fn store_previews(&self, computed: Vec<ConversationFile>) {
        let mut guard = self.write_groups();
        let Some(groups) = guard.as_mut() else {
            return;
        };
        for file in computed {
            if let Some(target) = groups
                .get_mut(&file.group)
                .and_then(|files| files.iter_mut().find(|f| f.path == file.path))
                && !target.preview_attempted
                && target.modified == file.modified
            {
                target.preview = file.preview;
                target.preview_attempted = true;
                target.provider = target.provider.or(file.provider);
            }
        }
    }

    /// Preview for a listed file, computed on first request.
    ///
    /// Returns `None` for unknown paths and for files without a usable user message.
    pub fn preview(&self, path: &Path) -> Option<String> {
        self.ensure_scanned();
        let mut file = self.find_file(path, &resolve_path(path))?;
        if file.preview_attempted {
            return file.preview;
        }
        let preview = file.load_preview(&self.config.meta_filter).map(str::to_string);
        self.store_previews(vec![file]);
        preview
    }

    pub async fn preview_async(&self, path: &Path) -> Option<String> {
        self.ensure_scanned_async().await;
        let mut file = self.find_file(path, &resolve_path_async(path).await)?;
        if file.preview_attempted {
            return file.preview;
        }
        let preview =
            file.load_preview_async(&self.config.meta_filter).await.map(str::to_string);
        self.store_previews(vec![file]);
        preview
    }

    fn pending_previews(&self, key: &str) -> Vec<ConversationFile> {
        self.read_groups()
            .as_ref()
            .and_then(|groups| groups.get(key))
            .map(|files| files.iter().filter(|f| !f.preview_attempted).cloned().collect())
            .unwrap_or_default()
    }

    /// Compute every missing preview in one group; returns the group's files.
    pub fn load_group_previews(&self, key: &str) -> Vec<ConversationFile> {
        self.ensure_scanned();
        let mut pending = self.pending_previews(key);
        load_previews(&mut pending, &self.config.meta_filter);
        self.store_previews(pending);
        self.files_in_scope(&GroupScope::One(key.to_string()))
    }

    pub async fn load_group_previews_async(&self, key: &str) -> Vec<ConversationFile> {
        self.ensure_scanned_async().await;
        let mut pending = self.pending_previews(key);
        load_previews_async(&mut pending, &self.config.meta_filter).await;
        self.store_previews(pending);
        self.files_in_scope(&GroupScope::One(key.to_string()))
    }

    fn to_canonical(&self, path: &Path, text: String) -> String {
        match classify(path, &self.codex_roots, &text) {
            Provider::Codex => self.converter.convert(&text),
            Provider::Claude => text,
        }
    }

    /// Full canonical text of a session file, converting Codex rollouts.
    ///
    /// The in-memory mapping is not touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stat'd or read. Files above
    /// [`MAX_READ_SIZE`] are not an error; they yield [`ReadOutcome::TooLarge`].
    pub fn read_conversation(&self, path: &Path) -> Result<ReadOutcome> {
        let outcome = read_bounded(path, MAX_READ_SIZE)?;
        Ok(outcome.map_content(|text| self.to_canonical(path, text)))
    }

    pub async fn read_conversation_async(&self, path: &Path) -> Result<ReadOutcome> {
        let outcome = read_bounded_async(path, MAX_READ_SIZE).await?;
        Ok(outcome.map_content(|text| self.to_canonical(path, text)))
    }
}
