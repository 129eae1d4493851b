//! Lazy, memoized previews on [`ConversationFile`] records.
//!
//! A preview is attempted at most once per record (`preview_attempted`). Failures to read
//! are logged and leave `preview` as `None`. Group fan-out gives each task exclusive
//! ownership of one record, so no locking is involved.

use futures::future::join_all;
use rayon::prelude::*;
use tracing::warn;

use crate::models::ConversationFile;
use crate::parsers::classify_content;
use crate::parsers::meta::MetaFilter;
use crate::parsers::preview::{CODEX_PREVIEW_BYTES, extract_preview_with, preview_sample_bytes};
use crate::utils::files::{read_prefix, read_prefix_async};

impl ConversationFile {
    fn sample_bytes(&self) -> usize {
        self.provider.map(preview_sample_bytes).unwrap_or(CODEX_PREVIEW_BYTES)
    }

    fn apply_sample(&mut self, sample: &str, filter: &MetaFilter) {
        if self.provider.is_none() {
            self.provider = Some(classify_content(sample));
        }
        let preview = extract_preview_with(sample, filter);
        self.preview = (!preview.is_empty()).then_some(preview);
    }

    /// Compute the preview if it has not been attempted yet.
    pub fn load_preview(&mut self, filter: &MetaFilter) -> Option<&str> {
        if !self.preview_attempted {
            self.preview_attempted = true;
            match read_prefix(&self.path, self.sample_bytes()) {
                Ok(sample) => self.apply_sample(&sample, filter),
                Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to read preview"),
            }
        }
        self.preview.as_deref()
    }

    pub async fn load_preview_async(&mut self, filter: &MetaFilter) -> Option<&str> {
        if !self.preview_attempted {
            self.preview_attempted = true;
            match read_prefix_async(&self.path, self.sample_bytes()).await {
                Ok(sample) => self.apply_sample(&sample, filter),
                Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to read preview"),
            }
        }
        self.preview.as_deref()
    }
}

/// Compute missing previews for `files` in parallel.
pub fn load_previews(files: &mut [ConversationFile], filter: &MetaFilter) {
    files.par_iter_mut().filter(|file| !file.preview_attempted).for_each(|file| {
        file.load_preview(filter);
    });
}

/// Compute missing previews for `files` concurrently.
pub async fn load_previews_async(files: &mut [ConversationFile], filter: &MetaFilter) {
    let pending = files.iter_mut().filter(|file| !file.preview_attempted).map(|file| async move {
        file.load_preview_async(filter).await;
    });
    join_all(pending).await;
}
