//! Server context and lifecycle
//!
//! [`ServerContext`] is built once per successful startup and shared by every
//! connection task. It owns the producer side of the write queue, the
//! admission limiter and the counters; nothing else is global.

pub mod lifecycle;
pub mod pid;
pub mod signal;

pub use lifecycle::{run_with_retries, BoundServer, LifecycleManager};
pub use pid::PidFile;
pub use signal::shutdown_signal;

use crate::admission::ConnectionLimiter;
use crate::config::IngestdConfig;
use crate::ingest::{IngestStats, WriteQueue};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// State shared by every request handler
#[derive(Debug)]
pub struct ServerContext {
    pub config: IngestdConfig,
    /// Actual bound address (differs from config when port 0 was requested)
    pub local_addr: SocketAddr,
    pub started: Instant,
    pub started_at: DateTime<Local>,
    pub queue: WriteQueue,
    pub limiter: ConnectionLimiter,
    pub stats: Arc<IngestStats>,
}

impl ServerContext {
    pub fn new(config: IngestdConfig, queue: WriteQueue, local_addr: SocketAddr) -> Self {
        let limiter = ConnectionLimiter::new(config.server.max_connections);
        Self {
            config,
            local_addr,
            started: Instant::now(),
            started_at: Local::now(),
            queue,
            limiter,
            stats: Arc::new(IngestStats::new()),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// `Stopped -> Binding -> Listening -> ShuttingDown -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Stopped,
    Binding,
    Listening,
    ShuttingDown,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Binding => "binding",
            Self::Listening => "listening",
            Self::ShuttingDown => "shutting_down",
        };
        f.write_str(name)
    }
}
