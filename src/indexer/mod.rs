//! Store scanning, group merging and per-conversation indexes
//!
//! # Error Handling Strategy
//!
//! Scans degrade gracefully and never fail as a whole:
//!
//! - **Missing roots**: Skipped silently (debug log). A default root such as
//!   `~/.codex/sessions` is often absent.
//!
//! - **Unreadable directories and files**: Logged with `tracing::warn!` and skipped, so one
//!   bad directory does not hide the rest of the store.
//!
//! - **Summary reporting**: Each completed scan logs root, group and file counts at info
//!   level.
//!
//! - **Merging**: Results from all roots merge into one [`GroupMap`](crate::models::GroupMap)
//!   keyed by absolute path, so overlapping roots never produce duplicates.

pub mod async_discovery;
pub mod discovery;
pub mod merge;
pub mod previews;
pub mod tool_index;

pub use async_discovery::{scan_root_async, scan_roots_async};
pub use discovery::{group_from_head, scan_root, scan_roots};
pub use merge::merge_files;
pub use previews::{load_previews, load_previews_async};
pub use tool_index::{ToolCorrelation, UNKNOWN_TOOL, build_tool_index};
