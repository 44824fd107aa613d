//! Static download allow-list
//!
//! Routes map to fixed files under `server.base_dir`. Request paths are only
//! ever compared against this list, never joined onto the filesystem.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// One servable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    /// Exact request path, e.g. `/msu.zip`
    pub route: String,
    /// File relative to `server.base_dir`
    pub file: String,
    /// Explicit content type; guessed from the extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Send `Content-Disposition: attachment`
    #[serde(default)]
    pub attachment: bool,
}

impl DownloadEntry {
    pub fn page(route: &str, file: &str) -> Self {
        Self {
            route: route.to_string(),
            file: file.to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            attachment: false,
        }
    }

    pub fn archive(route: &str, file: &str) -> Self {
        Self {
            route: route.to_string(),
            file: file.to_string(),
            content_type: Some("application/zip".to_string()),
            attachment: true,
        }
    }

    /// Content type to send, falling back to a guess from the file extension
    pub fn resolved_content_type(&self) -> String {
        match &self.content_type {
            Some(ct) => ct.clone(),
            None => mime_guess::from_path(&self.file).first_or_octet_stream().to_string(),
        }
    }

    /// Name sent in `Content-Disposition`
    pub fn file_name(&self) -> &str {
        Path::new(&self.file).file_name().and_then(|n| n.to_str()).unwrap_or(&self.file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub entries: Vec<DownloadEntry>,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            entries: vec![
                DownloadEntry::page("/", "index.html"),
                DownloadEntry::page("/index.html", "index.html"),
                DownloadEntry::archive("/SecurityCheck_v5", "SecurityCheck.zip"),
                DownloadEntry::archive("/msu.zip", "msu.zip"),
                DownloadEntry::archive("/server.zip", "server.zip"),
                DownloadEntry::page("/README-Server.html", "README-Server.html"),
                DownloadEntry::page("/README-Client.html", "README-Client.html"),
            ],
        }
    }
}

impl DownloadsConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            if !entry.route.starts_with('/') {
                bail!("Invalid download route '{}': must start with '/'", entry.route);
            }
            if matches!(entry.route.as_str(), "/log" | "/health" | "/status") {
                bail!("Invalid download route '{}': reserved path", entry.route);
            }
            let plain = !entry.file.is_empty()
                && Path::new(&entry.file).components().all(|c| matches!(c, Component::Normal(_)));
            if !plain {
                bail!("Invalid download file '{}': must be a plain relative path", entry.file);
            }
        }
        Ok(())
    }

    /// Exact-match lookup of a request path
    pub fn find(&self, route: &str) -> Option<&DownloadEntry> {
        self.entries.iter().find(|e| e.route == route)
    }
}
