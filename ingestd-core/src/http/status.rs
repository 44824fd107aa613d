//! `/health` and `/status` reporters

use super::{json_response, pretty_json_response, Resp};
use crate::admission::AdmissionSnapshot;
use crate::server::ServerContext;
use hyper::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    /// Seconds since the server context was created (monotonic)
    pub uptime: f64,
    pub timestamp: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
    pub start_time: String,
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub monitor_dir: String,
    pub pid_file: String,
}

#[derive(Debug, Serialize)]
pub struct IngestInfo {
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub accepted: u64,
    pub rejected_full: u64,
    pub rejected_client: u64,
    pub internal_errors: u64,
    pub written: u64,
    pub write_errors: u64,
    pub rotations: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub server_info: ServerInfo,
    pub file_info: FileInfo,
    pub ingest: IngestInfo,
    pub connections: AdmissionSnapshot,
}

pub fn health_report(ctx: &ServerContext) -> HealthReport {
    HealthReport {
        status: "healthy",
        uptime: ctx.uptime().as_secs_f64(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: crate::VERSION,
    }
}

pub fn status_report(ctx: &ServerContext) -> StatusReport {
    let stats = ctx.stats.snapshot();
    StatusReport {
        server_info: ServerInfo {
            host: ctx.config.server.host.clone(),
            port: ctx.local_addr.port(),
            start_time: ctx.started_at.to_rfc3339(),
            uptime: ctx.uptime().as_secs_f64(),
        },
        file_info: FileInfo {
            monitor_dir: ctx.config.monitor_dir().display().to_string(),
            pid_file: ctx.config.pid_file().display().to_string(),
        },
        ingest: IngestInfo {
            queue_depth: ctx.queue.len(),
            queue_capacity: ctx.queue.capacity(),
            accepted: stats.accepted,
            rejected_full: stats.rejected_full,
            rejected_client: stats.rejected_client,
            internal_errors: stats.internal_errors,
            written: stats.written,
            write_errors: stats.write_errors,
            rotations: stats.rotations,
        },
        connections: ctx.limiter.snapshot(),
    }
}

pub fn health_response(ctx: &ServerContext) -> Resp {
    json_response(StatusCode::OK, &health_report(ctx))
}

pub fn status_response(ctx: &ServerContext) -> Resp {
    pretty_json_response(StatusCode::OK, &status_report(ctx))
}
