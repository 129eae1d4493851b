//! Session Ingest - Read Claude Code and Codex session logs as one conversation model
//!
//! This library discovers the line-delimited JSON session logs written by Claude Code
//! (`~/.claude/projects/`) and the Codex CLI (`~/.codex/sessions/`) and normalizes both into
//! the Claude Code entry schema. It supports:
//!
//! - Scanning default and profile roots into project groups (blocking or async)
//! - Classifying files as Claude or Codex by location or content
//! - Converting Codex rollouts into canonical entries in a single ordered pass
//! - Tolerant validation where malformed lines become error entries instead of failures
//! - Lazy previews and tool invocation/result correlation
//!
//! # Example
//!
//! ```no_run
//! use session_ingest::{ConversationStore, GroupScope, ReadOutcome, StoreConfig, parse_entries};
//!
//! let store = ConversationStore::new(StoreConfig::from_env()?);
//! for group in store.list_groups() {
//!     println!("{} ({} sessions)", group.label, group.file_count);
//! }
//!
//! let files = store.list_files(&GroupScope::All);
//! if let Some(file) = files.first()
//!     && let ReadOutcome::Content(text) = store.read_conversation(&file.path)?
//! {
//!     let entries = parse_entries(&text);
//!     println!("{} entries in {}", entries.len(), file.name);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod indexer;
pub mod models;
pub mod parsers;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::{StoreConfig, StoreRoot};
pub use indexer::{ToolCorrelation, build_tool_index, scan_roots, scan_roots_async};
pub use models::{
    CanonicalEntry, ConversationFile, GroupMap, GroupScope, GroupSummary, Provider,
};
pub use parsers::{
    CodexConverter, MetaFilter, classify, convert_codex_text, extract_preview, parse_entries,
    validate_line,
};
pub use store::{ConversationStore, ScanStatus};
pub use utils::files::ReadOutcome;
pub use utils::paths::{encode_group_key, format_path_with_tilde};
