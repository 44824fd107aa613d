//! Shared helpers for integration tests: a real server on an ephemeral port.

#![allow(dead_code)]

use ingestd_core::config::IngestdConfig;
use ingestd_core::server::{LifecycleManager, ServerContext};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    pub dir: TempDir,
    pub ctx: Arc<ServerContext>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// Config rooted in `dir`, bound to an ephemeral loopback port
pub fn test_config(dir: &std::path::Path) -> IngestdConfig {
    let mut config = IngestdConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.base_dir = dir.display().to_string();
    config.lifecycle.retry_delay_override = Some(Duration::from_millis(50));
    config
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut IngestdConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        configure(&mut config);
        config.validate().unwrap();

        let server = LifecycleManager::new(config).start().await.unwrap();
        let addr = server.local_addr();
        let ctx = server.context();

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(async move {
            let _ = rx.await;
        }));

        Self { addr, dir, ctx, shutdown: Some(tx), handle: Some(handle) }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Log file of the loopback source
    pub fn source_log(&self) -> PathBuf {
        self.dir.path().join("Monitor").join("127.0.0.1.txt")
    }

    /// Wait until the writer has processed everything queued so far
    pub async fn drain(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.ctx.queue.flush())
            .await
            .expect("writer drained in time")
            .unwrap();
    }

    pub async fn stop(mut self) -> TempDir {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        }
        self.dir
    }
}

/// Send raw bytes and read until the response head is complete or the peer closes.
pub async fn raw_request(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    let read_head = async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read_head).await.expect("response in time");
    String::from_utf8_lossy(&response).into_owned()
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
