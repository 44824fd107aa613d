//! ingestd - Core
//!
//! A long-running HTTP service that accepts JSON telemetry reports from remote
//! agents and persists each report, in arrival order, to a per-source text log.
//!
//! # Overview
//!
//! Every accepted connection passes the admission limiter, then the router.
//! `POST /log` decodes and parses the body, builds an [`IngestionRecord`] and
//! pushes it onto the bounded write queue without waiting for disk. A single
//! writer thread drains the queue into the [`AppendLogStore`], which is the
//! only code that ever touches the monitor directory.
//!
//! ```text
//! accept ─► admission ─► router ─┬─► POST /log ─► decode ─► parse ─► queue ─► 200
//!                                ├─► GET /health, /status
//!                                └─► GET <download> ─► chunked file stream
//!                                                  queue ─► writer thread ─► <source>.txt
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ingestd_core::config::IngestdConfig;
//! use ingestd_core::server::run_with_retries;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestdConfig::load()?;
//!     run_with_retries(config, ingestd_core::server::shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`config`] - Layered configuration (defaults, TOML, environment)
//! - [`logging`] - `log`/`env_logger` setup with optional daily file
//! - [`encoding`] - Charset detection and body decoding
//! - [`ingest`] - Records, payload parsing, bounded queue and writer worker
//! - [`store`] - Append-only per-source log files with size rotation
//! - [`admission`] - Connection admission limiter
//! - [`http`] - Router, handlers and socket timeouts on top of hyper
//! - [`server`] - Shared server context and lifecycle manager

pub mod admission; // Counting limiter for concurrently handled connections
pub mod config; // Configuration system with TOML support
pub mod encoding;
pub mod error;
pub mod http;
pub mod ingest; // Record, payload parser, write queue, writer worker
pub mod logging;
pub mod server;
pub mod store; // Per-source append log store

// Re-exports of main types
pub use admission::{AdmissionPermit, ConnectionLimiter};
pub use config::IngestdConfig;
pub use error::{IngestError, StartupError, StoreError};
pub use ingest::{IngestionRecord, WriteQueue, WriterWorker};
pub use server::{BoundServer, LifecycleManager, LifecycleState, ServerContext};
pub use store::AppendLogStore;

/// Crate version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
