//! Append log store
//!
//! One text file per source identifier under the monitor directory, one line
//! per record: `[<timestamp>] <json>`. Files are only ever appended to, and a
//! file that has reached the rotation threshold is moved to `<name>.txt.1`
//! before the next line is written.
//!
//! The store does no locking of its own; it relies on being driven by the
//! single writer worker.

pub mod rotation;

use crate::error::StoreError;
use crate::ingest::IngestionRecord;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File extension of source logs
pub const LOG_EXTENSION: &str = "txt";

/// Result of a successful append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub path: PathBuf,
    /// The previous file was moved to its backup name first
    pub rotated: bool,
    /// Bytes written, including the trailing newline
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct AppendLogStore {
    dir: PathBuf,
    rotate_bytes: u64,
}

impl AppendLogStore {
    /// Open (creating if needed) the monitor directory
    pub fn open(dir: impl AsRef<Path>, rotate_bytes: u64) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|source| StoreError::CreateDir { path: dir.clone(), source })?;
        Ok(Self { dir, rotate_bytes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn rotate_bytes(&self) -> u64 {
        self.rotate_bytes
    }

    /// Log file for a source identifier
    pub fn path_for(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", file_stem_for(source), LOG_EXTENSION))
    }

    /// Append one record, rotating first if the file is at the threshold.
    pub fn append(&self, record: &IngestionRecord) -> Result<AppendOutcome, StoreError> {
        let line = record.to_line()?;
        let path = self.path_for(&record.source);

        let rotated = rotation::rotate_if_needed(&path, self.rotate_bytes)
            .map_err(|source| StoreError::Rotate { path: path.clone(), source })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Append { path: path.clone(), source })?;
        // One write_all per line so a line is never split across calls
        file.write_all(line.as_bytes())
            .map_err(|source| StoreError::Append { path: path.clone(), source })?;

        Ok(AppendOutcome { path, rotated, bytes: line.len() as u64 })
    }
}

/// Map a source identifier to a safe file stem.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`, so IPv4 addresses pass
/// through unchanged and IPv6 colons are replaced.
pub fn file_stem_for(source: &str) -> String {
    let stem: String = source
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        stem
    }
}
