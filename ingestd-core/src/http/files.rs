//! Static downloads from the allow-list
//!
//! Files are streamed in fixed-size chunks rather than read into memory.
//! A client that disconnects mid-transfer just ends the stream; the
//! interruption is logged with the number of bytes handed to the connection.

use super::{internal_server_error_response, not_found_response, Resp};
use crate::config::DownloadEntry;
use bytes::Bytes;
use http_body_util::{BodyExt, StreamBody};
use http_body::Frame;
use hyper::{Response, StatusCode};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Chunk size for streamed downloads
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Logs transfers that end before the last byte
struct TransferGuard {
    route: String,
    total: u64,
    sent: u64,
    finished: bool,
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!(
                "Download of {} interrupted after {} of {} bytes",
                self.route,
                self.sent,
                self.total
            );
        }
    }
}

/// Serve one allow-listed file found under `base_dir`.
pub async fn serve_download(entry: &DownloadEntry, base_dir: &Path) -> Resp {
    let path: PathBuf = base_dir.join(&entry.file);

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("Download {} missing on disk: {}", entry.route, path.display());
            return not_found_response(&entry.route);
        }
        Err(e) => {
            log::error!("Failed to open {}: {}", path.display(), e);
            return internal_server_error_response("file unavailable");
        }
    };
    let total = match file.metadata().await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return not_found_response(&entry.route),
        Err(e) => {
            log::error!("Failed to stat {}: {}", path.display(), e);
            return internal_server_error_response("file unavailable");
        }
    };

    let route = entry.route.clone();
    let stream = async_stream::stream! {
        let mut guard = TransferGuard { route, total, sent: 0, finished: false };
        let mut file = file;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => {
                    guard.finished = true;
                    break;
                }
                Ok(n) => {
                    guard.sent += n as u64;
                    yield Ok(Frame::data(Bytes::copy_from_slice(&buf[..n])));
                }
                Err(e) => {
                    log::error!("Read error while serving {}: {}", guard.route, e);
                    yield Err(e);
                    break;
                }
            }
        }
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", entry.resolved_content_type())
        .header("Content-Length", total);
    if entry.attachment {
        builder = builder.header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", entry.file_name()),
        );
    }

    builder.body(StreamBody::new(stream).boxed_unsync()).expect("valid HTTP response")
}
