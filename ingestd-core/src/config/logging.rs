//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file_enabled: false, log_dir: "logs".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }
    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("INGESTD_LOG") {
            self.level = level;
        }
    }
    pub fn validate(&self) -> Result<()> {
        if self.level.parse::<log::LevelFilter>().is_err() {
            bail!("Invalid logging level: {}", self.level);
        }
        Ok(())
    }
}
