//! JSONL parsers for Claude Code and Codex session logs
//!
//! # Error Handling Strategy
//!
//! Nothing in this module fails. Session logs are append-only and written by tools that
//! change their schema over time, so a single bad line must never hide the rest of a file:
//!
//! - **Malformed lines**: Lines that are not JSON, or match no canonical variant, become
//!   [`CanonicalEntry::Error`](crate::models::CanonicalEntry::Error) entries holding the raw
//!   line, in place.
//!
//! - **Schema drift**: [`validator::normalize_entry`] rewrites legacy and incomplete records
//!   before validation instead of rejecting them.
//!
//! - **Unconvertible Codex files**: When conversion produces no entries the original text is
//!   returned unchanged.
//!
//! Diagnostics go to `tracing` at debug level.

pub mod classify;
pub mod codex;
pub mod deserializers;
pub mod meta;
pub mod preview;
pub mod validator;

pub use classify::{classify, classify_content, classify_path};
pub use codex::{CodexConverter, SessionContext, convert_codex_text};
pub use meta::{MetaFilter, is_meta_content};
pub use preview::{extract_preview, extract_preview_with};
pub use validator::{parse_entries, validate_line, validate_value};
