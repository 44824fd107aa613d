//! Storage configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the per-source logs, relative to `server.base_dir`
    /// Env: INGESTD_MONITOR_DIR
    pub monitor_dir: String,
    /// Bounded write queue capacity
    /// Env: INGESTD_QUEUE_CAPACITY
    pub queue_capacity: usize,
    /// Size at which a source log is rotated to `<name>.txt.1`
    /// Env: INGESTD_ROTATE_BYTES
    pub rotate_bytes: u64,
    /// Minimum detector confidence before a non-UTF-8 guess is trusted
    pub encoding_confidence: f32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            monitor_dir: "Monitor".to_string(),
            queue_capacity: 10_000,
            rotate_bytes: 10 * 1024 * 1024,
            encoding_confidence: 0.7,
        }
    }
}

impl StorageConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(dir) = env::var("INGESTD_MONITOR_DIR") {
            self.monitor_dir = dir;
        }
        if let Ok(cap) = env::var("INGESTD_QUEUE_CAPACITY") {
            if let Ok(c) = cap.parse() {
                self.queue_capacity = c;
            }
        }
        if let Ok(bytes) = env::var("INGESTD_ROTATE_BYTES") {
            if let Ok(b) = bytes.parse() {
                self.rotate_bytes = b;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor_dir.is_empty() {
            bail!("Invalid monitor_dir: cannot be empty");
        }
        if self.queue_capacity == 0 {
            bail!("Invalid queue_capacity: must be at least 1");
        }
        if self.rotate_bytes == 0 {
            bail!("Invalid rotate_bytes: must be greater than 0");
        }
        if !(self.encoding_confidence > 0.0 && self.encoding_confidence <= 1.0) {
            bail!("Invalid encoding_confidence: must be in (0, 1]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_out_of_range() {
        let cfg = StorageConfig { encoding_confidence: 1.5, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = StorageConfig { encoding_confidence: 0.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_queue_rejected() {
        let cfg = StorageConfig { queue_capacity: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
