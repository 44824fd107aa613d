//! Startup retry and shutdown configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Total startup attempts before giving up
    /// Env: INGESTD_START_ATTEMPTS
    pub max_start_attempts: u32,
    /// Delay between failed attempts
    /// Env: INGESTD_RETRY_DELAY
    pub retry_delay_secs: u64,
    /// PID marker path, relative to `server.base_dir`
    /// Env: INGESTD_PID_FILE
    pub pid_file: String,
    /// How long shutdown waits for the writer to flush queued records
    pub shutdown_grace_ms: u64,
    /// Overrides `retry_delay_secs` with millisecond precision (tests)
    #[serde(skip)]
    pub retry_delay_override: Option<Duration>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_start_attempts: 3,
            retry_delay_secs: 5,
            pid_file: "server.pid".to_string(),
            shutdown_grace_ms: 2000,
            retry_delay_override: None,
        }
    }
}

impl LifecycleConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(n) = env::var("INGESTD_START_ATTEMPTS") {
            if let Ok(n) = n.parse() {
                self.max_start_attempts = n;
            }
        }
        if let Ok(delay) = env::var("INGESTD_RETRY_DELAY") {
            if let Ok(d) = delay.parse() {
                self.retry_delay_secs = d;
            }
        }
        if let Ok(pid) = env::var("INGESTD_PID_FILE") {
            self.pid_file = pid;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_start_attempts == 0 {
            bail!("Invalid max_start_attempts: must be at least 1");
        }
        if self.retry_delay_override.is_none() && self.retry_delay_secs == 0 {
            bail!("Invalid retry_delay_secs: must be greater than 0");
        }
        if self.shutdown_grace_ms == 0 {
            bail!("Invalid shutdown_grace_ms: must be greater than 0");
        }
        if self.pid_file.is_empty() {
            bail!("Invalid pid_file: cannot be empty");
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay_override
            .unwrap_or_else(|| Duration::from_secs(self.retry_delay_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
