//! Method + path dispatch table

use crate::config::{DownloadEntry, DownloadsConfig};
use hyper::Method;

pub const LOG_PATH: &str = "/log";
pub const HEALTH_PATH: &str = "/health";
pub const STATUS_PATH: &str = "/status";

/// Handler selected for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Ingest,
    Health,
    Status,
    Download(&'a DownloadEntry),
    NotFound,
    /// Method other than GET or POST
    Unsupported,
}

/// Resolve a request to its handler.
///
/// Downloads only match entries of the configured allow-list, exactly.
pub fn route<'a>(method: &Method, path: &str, downloads: &'a DownloadsConfig) -> Route<'a> {
    match *method {
        Method::POST => match path {
            LOG_PATH => Route::Ingest,
            _ => Route::NotFound,
        },
        Method::GET => match path {
            HEALTH_PATH => Route::Health,
            STATUS_PATH => Route::Status,
            _ => downloads.find(path).map(Route::Download).unwrap_or(Route::NotFound),
        },
        _ => Route::Unsupported,
    }
}
