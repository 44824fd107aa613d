//! Server configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening address
    /// Env: INGESTD_HOST
    /// Default: "0.0.0.0"
    pub host: String,

    /// Listening port (0 picks an ephemeral port)
    /// Env: INGESTD_PORT
    /// Default: 8000
    pub port: u16,

    /// Base directory for downloads, the PID marker and relative storage paths
    /// Env: INGESTD_BASE_DIR
    /// Default: "."
    pub base_dir: String,

    /// Per-operation socket read/write timeout in seconds
    /// Env: INGESTD_SOCKET_TIMEOUT
    /// Default: 10
    pub socket_timeout_secs: u64,

    /// Maximum accepted `POST /log` body in bytes
    /// Env: INGESTD_MAX_BODY_BYTES
    /// Default: 2097152 (2 MiB)
    pub max_body_bytes: u64,

    /// Maximum connections handled at once
    /// Env: INGESTD_MAX_CONNECTIONS
    /// Default: 200
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            base_dir: ".".to_string(),
            socket_timeout_secs: 10,
            max_body_bytes: 2 * 1024 * 1024,
            max_connections: 200,
        }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    /// Apply environment variables
    pub fn apply_env_vars(&mut self) {
        if let Ok(host) = env::var("INGESTD_HOST") {
            self.host = host;
        }

        if let Ok(port) = env::var("INGESTD_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(dir) = env::var("INGESTD_BASE_DIR") {
            self.base_dir = dir;
        }

        if let Ok(timeout) = env::var("INGESTD_SOCKET_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.socket_timeout_secs = t;
            }
        }

        if let Ok(size) = env::var("INGESTD_MAX_BODY_BYTES") {
            if let Ok(s) = size.parse() {
                self.max_body_bytes = s;
            }
        }

        if let Ok(conns) = env::var("INGESTD_MAX_CONNECTIONS") {
            if let Ok(c) = conns.parse() {
                self.max_connections = c;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }

        if self.socket_timeout_secs == 0 {
            bail!("Invalid socket_timeout_secs: must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            bail!("Invalid max_body_bytes: must be greater than 0");
        }

        if self.max_connections == 0 {
            bail!("Invalid max_connections: must be at least 1");
        }

        Ok(())
    }

    /// `host:port` string used for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }
}
