//! Data models for ingested conversation logs.
//!
//! - [`CanonicalEntry`] - One validated event in the canonical (Claude Code) schema, or an
//!   error entry holding a line that failed validation
//! - [`ConversationFile`] - A session file discovered on disk, with its lazily loaded preview
//! - [`GroupMap`] - Project/workspace group key to file listing
//!
//! Entry structs use serde with custom deserializers for timestamps in
//! [`crate::parsers::deserializers`].

pub mod entry;
pub mod store;

pub use entry::{
    AssistantContent, AssistantEntry, CanonicalEntry, EntryMeta, ErrorEntry,
    FileHistorySnapshotEntry, Message, MessageBody, QueueOperationEntry, SummaryEntry,
    SystemEntry, SystemLevel, UserContent, UserEntry,
};
pub use store::{ConversationFile, GroupMap, GroupScope, GroupSummary, Provider};
