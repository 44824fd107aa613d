//! Configuration system for ingestd
//!
//! Configuration is resolved once at process start and never reloaded.
//!
//! # Configuration Hierarchy
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code / CLI flags** - applied by the caller after loading
//! 2. **Environment Variables** - `INGESTD_*`
//! 3. **Config File** (`ingestd.toml`)
//! 4. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use ingestd_core::config::IngestdConfig;
//!
//! let config = IngestdConfig::load()?;
//! println!("monitor dir: {}", config.monitor_dir().display());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod downloads;
pub mod lifecycle;
pub mod logging;
pub mod server;
pub mod storage;

pub use downloads::{DownloadEntry, DownloadsConfig};
pub use lifecycle::LifecycleConfig;
pub use logging::LoggingConfig;
pub use server::ServerConfig;
pub use storage::StorageConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ingestd.toml";

/// Complete ingestd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestdConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub lifecycle: LifecycleConfig,
    pub logging: LoggingConfig,
    pub downloads: DownloadsConfig,
}

impl IngestdConfig {
    /// Load configuration with full supersedence chain from `ingestd.toml`
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, falling back to defaults when absent
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.storage.merge(other.storage);
        self.lifecycle.merge(other.lifecycle);
        self.logging.merge(other.logging);
        self.downloads.merge(other.downloads);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
        self.storage.apply_env_vars();
        self.lifecycle.apply_env_vars();
        self.logging.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.storage.validate()?;
        self.lifecycle.validate()?;
        self.logging.validate()?;
        self.downloads.validate()?;
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Root for downloads and relative paths
    pub fn base_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.base_dir)
    }

    /// Directory holding one `<source>.txt` per agent
    pub fn monitor_dir(&self) -> PathBuf {
        self.resolve(&self.storage.monitor_dir)
    }

    /// Location of the PID marker
    pub fn pid_file(&self) -> PathBuf {
        self.resolve(&self.lifecycle.pid_file)
    }

    /// Directory for the daily server log file
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    /// Resolve a path against `server.base_dir` (absolute paths are kept)
    pub fn resolve(&self, relative: &str) -> PathBuf {
        Path::new(&self.server.base_dir).join(relative)
    }
}
