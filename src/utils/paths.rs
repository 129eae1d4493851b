use std::borrow::Cow;
use std::fs;
use std::path::{self, Path, PathBuf};

/// Group key for sessions whose working directory is unknown
pub const UNKNOWN_GROUP: &str = "unknown";

/// Encodes a working directory into Claude's project directory format
///
/// Every character other than an ASCII letter or digit becomes `-`, which is how Claude Code
/// names the directories under `~/.claude/projects/`. The encoding is lossy.
///
/// # Examples
///
/// ```
/// use session_ingest::encode_group_key;
///
/// assert_eq!(encode_group_key("/Users/foo/my.app"), "-Users-foo-my-app");
/// ```
pub fn encode_group_key(cwd: &str) -> String {
    cwd.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '-' }).collect()
}

/// Group key for an optional working directory, falling back to [`UNKNOWN_GROUP`]
pub fn group_key_for_cwd(cwd: Option<&str>) -> String {
    match cwd.map(str::trim).filter(|c| !c.is_empty()) {
        Some(cwd) => encode_group_key(cwd),
        None => UNKNOWN_GROUP.to_string(),
    }
}

/// Best-effort reverse of [`encode_group_key`] for display
///
/// Dashes inside directory names cannot be told apart from separators, so
/// `-Users-foo-my-app` decodes to `/Users/foo/my/app`.
pub fn decode_group_key(key: &str) -> PathBuf {
    match key.strip_prefix('-') {
        Some(rest) => PathBuf::from(format!("/{}", rest.replace('-', "/"))),
        None => PathBuf::from(key),
    }
}

/// Human-readable label for a group key
pub fn group_label(key: &str) -> String {
    if key == UNKNOWN_GROUP {
        return key.to_string();
    }
    format_path_with_tilde(&decode_group_key(key))
}

/// Absolute, symlink-resolved form of `path`
///
/// Falls back to the lexical absolute path when `path` does not exist, and to `path`
/// itself when even that fails.
pub fn resolve_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Non-blocking [`resolve_path`].
pub async fn resolve_path_async(path: &Path) -> PathBuf {
    match tokio::fs::canonicalize(path).await {
        Ok(resolved) => resolved,
        Err(_) => path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// Formats a path with ~ substitution for the home directory
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use session_ingest::format_path_with_tilde;
///
/// let path = PathBuf::from("/Users/alice/Documents");
/// // Returns "~/Documents" if the home directory is /Users/alice
/// let formatted = format_path_with_tilde(&path);
/// ```
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

/// Internal helper for path formatting with optional home override (for testing)
pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = dirs::home_dir().map(|h| h.to_string_lossy().into_owned());
    let home = home_override.or(home_from_env.as_deref());

    // Component-wise, so /home/alice is not under /home/al
    if let Some(home) = home
        && !home.is_empty()
        && let Ok(rest) = path.strip_prefix(home)
    {
        if rest.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", rest.to_string_lossy());
    }

    let path_str = path.to_string_lossy();

    // Avoid double allocation when converting Cow to String
    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}
