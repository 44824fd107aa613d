//! PID marker file
//!
//! Advisory only: it is overwritten on startup and never checked for a
//! running owner.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    removed: bool,
}

impl PidFile {
    /// Write the current process id to `path`
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, std::process::id().to_string())?;
        Ok(Self { path, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the marker. A marker that is already gone is not an error.
    pub fn remove(mut self) {
        self.remove_now();
    }

    fn remove_now(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::info!("Removed PID file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove PID file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        self.remove_now();
    }
}
