//! `POST /log`
//!
//! Length check, body read, decode, parse, enqueue. The response never waits
//! for the record to reach disk.

use super::{json_error_response, json_response, Req, Resp};
use crate::error::IngestError;
use crate::ingest::{parse_payload, IngestionRecord};
use crate::server::ServerContext;
use http_body_util::{BodyExt, Limited};
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::StatusCode;

/// Validate the declared body length before anything is read.
pub fn declared_length(headers: &HeaderMap, max: u64) -> Result<u64, IngestError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or(IngestError::MissingLength)?;

    if declared == 0 {
        return Err(IngestError::EmptyBody);
    }
    if declared > max {
        return Err(IngestError::TooLarge { declared, max });
    }
    Ok(declared)
}

/// Run the ingestion path up to and including the enqueue.
pub async fn ingest(req: Req, ctx: &ServerContext, source: &str) -> Result<(), IngestError> {
    let declared = declared_length(req.headers(), ctx.config.server.max_body_bytes)?;

    let limit = usize::try_from(declared).unwrap_or(usize::MAX);
    let bytes = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| IngestError::Body(e.to_string()))?
        .to_bytes();

    let received = bytes.len() as u64;
    if received != declared {
        return Err(IngestError::LengthMismatch { declared, received });
    }

    let payload = parse_payload(&bytes, ctx.config.storage.encoding_confidence)?;
    ctx.queue.try_enqueue(IngestionRecord::now(source, payload))
}

/// `POST /log` handler: maps the outcome to a response and updates counters.
pub async fn handle_log(req: Req, ctx: &ServerContext, source: &str) -> Resp {
    match ingest(req, ctx, source).await {
        Ok(()) => {
            ctx.stats.record_accepted();
            json_response(StatusCode::OK, &serde_json::json!({ "status": "success" }))
        }
        Err(e) => {
            match &e {
                IngestError::QueueFull => {
                    ctx.stats.record_rejected_full();
                    log::warn!("Write queue full, dropping report from {}", source);
                }
                e if e.is_client_error() => {
                    ctx.stats.record_rejected_client();
                    log::debug!("Rejected report from {}: {}", source, e);
                }
                e => {
                    ctx.stats.record_internal_error();
                    log::error!("Failed to ingest report from {}: {}", source, e);
                }
            }
            json_error_response(e.status(), e.code(), &e.to_string())
        }
    }
}
