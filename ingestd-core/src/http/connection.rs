//! Per-connection handling
//!
//! Each accepted stream waits for an admission slot, gets the socket timeout
//! applied, and is then served by hyper. This is the boundary where anything
//! a handler did not turn into a response becomes a 500.

use super::files::serve_download;
use super::ingest::handle_log;
use super::router::{route, Route};
use super::status::{health_response, status_response};
use super::timeout::{is_timeout, TimedIo};
use super::{internal_server_error_response, json_error_response, not_found_response, Req, Resp};
use crate::server::ServerContext;
use futures::FutureExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpStream;

/// Serve one accepted connection until the peer closes it or it times out.
///
/// The admission slot is held for the whole connection, keep-alive included.
pub async fn handle_connection(stream: TcpStream, remote: SocketAddr, ctx: Arc<ServerContext>) {
    let Some(_permit) = ctx.limiter.acquire().await else {
        log::error!("Admission limiter closed, dropping connection from {}", remote);
        return;
    };

    let io = TokioIo::new(TimedIo::new(stream, ctx.config.server.socket_timeout()));
    let service = service_fn(move |req: Req| {
        let ctx = Arc::clone(&ctx);
        async move { Ok::<_, Infallible>(dispatch(req, &ctx, remote).await) }
    });

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        if is_timeout(&err) {
            log::debug!("Connection from {} timed out", remote);
        } else if err.is_incomplete_message() || err.is_canceled() {
            log::debug!("Connection from {} closed early: {}", remote, err);
        } else {
            log::warn!("Connection error from {}: {}", remote, err);
        }
    }
}

/// Route one request and convert a handler panic into a 500.
pub async fn dispatch(req: Req, ctx: &ServerContext, remote: SocketAddr) -> Resp {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let resp = guard_handler(handle(req, ctx, remote), ctx, &method, &path, remote).await;

    log::debug!(
        "{} {} {} -> {} ({} ms)",
        remote.ip(),
        method,
        path,
        resp.status().as_u16(),
        start.elapsed().as_millis()
    );
    resp
}

async fn guard_handler<F>(
    handler: F,
    ctx: &ServerContext,
    method: &Method,
    path: &str,
    remote: SocketAddr,
) -> Resp
where
    F: Future<Output = Resp>,
{
    match AssertUnwindSafe(handler).catch_unwind().await {
        Ok(resp) => resp,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Handler panicked on {} {} from {}: {}", method, path, remote, reason);
            ctx.stats.record_internal_error();
            internal_server_error_response("unexpected handler failure")
        }
    }
}

async fn handle(req: Req, ctx: &ServerContext, remote: SocketAddr) -> Resp {
    let path = req.uri().path().to_string();
    match route(req.method(), &path, &ctx.config.downloads) {
        Route::Ingest => handle_log(req, ctx, &remote.ip().to_string()).await,
        Route::Health => health_response(ctx),
        Route::Status => status_response(ctx),
        Route::Download(entry) => serve_download(entry, &ctx.config.base_dir()).await,
        Route::NotFound => not_found_response(&path),
        Route::Unsupported => json_error_response(
            StatusCode::NOT_IMPLEMENTED,
            "unsupported_method",
            &format!("Unsupported method ({})", req.method()),
        ),
    }
}
