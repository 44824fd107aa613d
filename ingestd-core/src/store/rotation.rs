//! Size-based rotation with a single backup generation

use std::io;
use std::path::{Path, PathBuf};

/// Suffix appended to a rotated file name
pub const BACKUP_SUFFIX: &str = ".1";

/// `<file>.1` next to `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Move `path` to its backup name if it has reached `threshold` bytes.
///
/// Any previous backup is removed first. Returns `true` when a rotation happened.
pub fn rotate_if_needed(path: &Path, threshold: u64) -> io::Result<bool> {
    let size = match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if size < threshold {
        return Ok(false);
    }

    let backup = backup_path(path);
    match std::fs::remove_file(&backup) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::rename(path, &backup)?;
    Ok(true)
}
