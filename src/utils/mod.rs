pub mod environment;
pub mod files;
pub mod paths;

pub use environment::{claude_projects_dir, codex_sessions_dir, discover_profile_roots, home_dir};
pub use files::{MAX_READ_SIZE, MIN_FILE_SIZE, ReadOutcome, read_bounded, read_bounded_async};
pub use paths::{
    UNKNOWN_GROUP, decode_group_key, encode_group_key, format_path_with_tilde, group_key_for_cwd,
    group_label,
};
