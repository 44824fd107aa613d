//! Error types for the ingestion service
//!
//! Request-path failures carry the HTTP status they surface as, so the
//! connection boundary is the only place that turns errors into responses.

use hyper::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures on the `POST /log` path.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No `Content-Length` header (chunked or missing)
    #[error("request body length not declared")]
    MissingLength,

    /// Declared length is zero
    #[error("request body is empty")]
    EmptyBody,

    /// Declared length exceeds the configured maximum
    #[error("request body too large: {declared} bytes (max {max})")]
    TooLarge { declared: u64, max: u64 },

    /// Body arrived shorter or longer than declared
    #[error("request body length mismatch: declared {declared}, received {received}")]
    LengthMismatch { declared: u64, received: u64 },

    /// Decoded text is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Bounded write queue has no free slot
    #[error("write queue is full")]
    QueueFull,

    /// Writer worker has stopped and the queue is closed
    #[error("write queue is closed")]
    QueueClosed,

    /// Reading the body from the socket failed
    #[error("failed to read request body: {0}")]
    Body(String),
}

impl IngestError {
    /// HTTP status the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingLength | Self::EmptyBody | Self::TooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::LengthMismatch { .. } | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            Self::QueueClosed | Self::Body(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable snake_case code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingLength => "length_required",
            Self::EmptyBody => "empty_body",
            Self::TooLarge { .. } => "payload_too_large",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::InvalidJson(_) => "invalid_json",
            Self::QueueFull => "busy",
            Self::QueueClosed => "queue_closed",
            Self::Body(_) => "body_read_failed",
        }
    }

    /// True for errors caused by the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

/// Append or rotation failure in the log store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to prepare monitor directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rotate {path}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Startup failures seen by the lifecycle manager.
#[derive(Debug, Error)]
pub enum StartupError {
    /// One startup attempt failed
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Bound, but the PID marker or writer could not be set up
    #[error("startup failed after bind: {0}")]
    Setup(String),

    /// Every attempt failed
    #[error("server failed to start after {attempts} attempts (retry delay {delay:?}): {last}")]
    RetriesExhausted {
        attempts: u32,
        delay: Duration,
        #[source]
        last: Box<StartupError>,
    },
}
