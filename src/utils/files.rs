//! Size-checked file reads.
//!
//! Full reads are refused above [`MAX_READ_SIZE`]; the check happens against metadata
//! before any bytes are read. Prefix reads are used for previews and group sniffing and
//! decode lossily, since a byte budget can split a multi-byte character.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt};

/// Files smaller than this are dropped during discovery (1 KiB)
pub const MIN_FILE_SIZE: u64 = 1024;

/// Maximum size accepted for a full read (50 MiB)
pub const MAX_READ_SIZE: u64 = 50 * 1024 * 1024;

/// Result of a size-checked full read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Content(String),
    /// Not read: the file exceeds `limit`.
    TooLarge { size: u64, limit: u64 },
}

impl ReadOutcome {
    pub fn content(&self) -> Option<&str> {
        match self {
            ReadOutcome::Content(text) => Some(text),
            ReadOutcome::TooLarge { .. } => None,
        }
    }

    /// Apply `f` to the content, leaving `TooLarge` as is.
    pub fn map_content(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            ReadOutcome::Content(text) => ReadOutcome::Content(f(text)),
            too_large => too_large,
        }
    }
}

fn check_size(size: u64, limit: u64) -> Option<ReadOutcome> {
    (size > limit).then_some(ReadOutcome::TooLarge { size, limit })
}

fn decode_lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Read a whole file, refusing files larger than `limit`.
///
/// Invalid UTF-8 is replaced with U+FFFD, so a corrupt line fails validation on its own
/// instead of failing the read.
///
/// # Errors
///
/// Returns an error if the file cannot be stat'd, opened or read.
pub fn read_bounded(path: &Path, limit: u64) -> Result<ReadOutcome> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    if let Some(refused) = check_size(metadata.len(), limit) {
        return Ok(refused);
    }

    let bytes =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(ReadOutcome::Content(decode_lossy(bytes)))
}

/// Non-blocking [`read_bounded`].
pub async fn read_bounded_async(path: &Path, limit: u64) -> Result<ReadOutcome> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    if let Some(refused) = check_size(metadata.len(), limit) {
        return Ok(refused);
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(ReadOutcome::Content(decode_lossy(bytes)))
}

/// Read at most `max_bytes` from the start of a file.
pub fn read_prefix(path: &Path, max_bytes: usize) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
    file.take(max_bytes as u64)
        .read_to_end(&mut buf)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub async fn read_prefix_async(path: &Path, max_bytes: usize) -> Result<String> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
    file.take(max_bytes as u64)
        .read_to_end(&mut buf)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read up to `max_lines` lines from the start of a file.
///
/// Lines that are not valid UTF-8 are decoded lossily.
pub fn read_head_lines(path: &Path, max_lines: usize) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    while lines.len() < max_lines {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        if read == 0 {
            break;
        }
        lines.push(String::from_utf8_lossy(&buf).trim_end().to_string());
    }
    Ok(lines)
}

pub async fn read_head_lines_async(path: &Path, max_lines: usize) -> Result<Vec<String>> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = tokio::io::BufReader::new(file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    while lines.len() < max_lines {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        if read == 0 {
            break;
        }
        lines.push(String::from_utf8_lossy(&buf).trim_end().to_string());
    }
    Ok(lines)
}
