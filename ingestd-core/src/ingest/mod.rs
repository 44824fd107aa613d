//! Ingestion pipeline
//!
//! Request handlers build an [`IngestionRecord`] and hand it to the
//! [`WriteQueue`]; the [`WriterWorker`] is the queue's only consumer and the
//! only writer of the log store.

pub mod queue;
pub mod stats;
pub mod writer;

pub use queue::{bounded, QueueReceiver, WriteCommand, WriteQueue};
pub use stats::{IngestStats, IngestStatsSnapshot};
pub use writer::WriterWorker;

use crate::encoding::{decode_body, DecodePath};
use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamp format used in log lines (local time, second precision)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One accepted report, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRecord {
    /// Remote peer address the report came from
    pub source: String,
    /// Local time the request was decoded
    pub timestamp: String,
    pub payload: Value,
}

impl IngestionRecord {
    pub fn new(source: impl Into<String>, timestamp: impl Into<String>, payload: Value) -> Self {
        Self { source: source.into(), timestamp: timestamp.into(), payload }
    }

    /// Build a record stamped with the current local time
    pub fn now(source: impl Into<String>, payload: Value) -> Self {
        Self::new(source, current_timestamp(), payload)
    }

    /// Log line: `[<timestamp>] <json>\n`
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(&self.payload)?;
        Ok(format!("[{}] {}\n", self.timestamp, json))
    }
}

pub fn current_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Decode raw body bytes and parse them as JSON.
pub fn parse_payload(bytes: &[u8], min_confidence: f32) -> Result<Value, IngestError> {
    let decoded = decode_body(bytes, min_confidence);
    match &decoded.path {
        DecodePath::Utf8 => {}
        DecodePath::Detected(name) => {
            log::debug!("Decoded body as {} (confidence {:?})", name, decoded.confidence);
        }
        DecodePath::LossyUtf8 => {
            log::debug!("Decoded body as lossy UTF-8 (confidence {:?})", decoded.confidence);
        }
    }
    Ok(serde_json::from_str(&decoded.text)?)
}
