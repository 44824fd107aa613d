//! Startup, accept loop and shutdown
//!
//! A startup attempt binds the listener, writes the PID marker, opens the
//! monitor directory and starts the writer worker. If any step fails the whole
//! attempt is retried after a fixed delay, up to a fixed number of attempts.

use super::pid::PidFile;
use super::{LifecycleState, ServerContext};
use crate::config::IngestdConfig;
use crate::error::StartupError;
use crate::http::handle_connection;
use crate::ingest::{bounded, WriterWorker};
use crate::store::AppendLogStore;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Pause after a failed `accept()` (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Drives one server instance through its lifecycle states
pub struct LifecycleManager {
    config: IngestdConfig,
    state: Arc<watch::Sender<LifecycleState>>,
}

impl LifecycleManager {
    pub fn new(config: IngestdConfig) -> Self {
        let (state, _) = watch::channel(LifecycleState::Stopped);
        Self { config, state: Arc::new(state) }
    }

    pub fn config(&self) -> &IngestdConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: LifecycleState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            log::debug!("Lifecycle: {} -> {}", previous, state);
        }
    }

    /// A single startup attempt, no retry.
    pub async fn try_start(&self) -> Result<BoundServer, StartupError> {
        self.set_state(LifecycleState::Binding);
        let addr = self.config.server.bind_addr();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| StartupError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StartupError::Bind { addr: addr.clone(), source })?;

        let pid_path = self.config.pid_file();
        let pid_file = PidFile::create(&pid_path).map_err(|e| {
            StartupError::Setup(format!("cannot write PID file {}: {}", pid_path.display(), e))
        })?;

        let store = AppendLogStore::open(self.config.monitor_dir(), self.config.storage.rotate_bytes)
            .map_err(|e| StartupError::Setup(e.to_string()))?;

        let (queue, rx) = bounded(self.config.storage.queue_capacity);
        let ctx = Arc::new(ServerContext::new(self.config.clone(), queue, local_addr));
        let worker = WriterWorker::spawn(rx, store, Arc::clone(&ctx.stats))
            .map_err(|e| StartupError::Setup(format!("cannot start writer worker: {}", e)))?;

        self.set_state(LifecycleState::Listening);
        log::info!("ingestd {} listening on http://{}", crate::VERSION, local_addr);
        log::info!("   Monitor directory: {}", self.config.monitor_dir().display());
        log::info!("   PID file: {} (pid {})", pid_path.display(), std::process::id());
        log::info!(
            "   Limits: {} connections, {} queued records, {} byte bodies",
            self.config.server.max_connections,
            self.config.storage.queue_capacity,
            self.config.server.max_body_bytes
        );

        Ok(BoundServer { listener, ctx, worker, pid_file, state: Arc::clone(&self.state) })
    }

    /// Startup with the configured retry policy.
    ///
    /// There is no delay after the last failed attempt.
    pub async fn start(&self) -> Result<BoundServer, StartupError> {
        let attempts = self.config.lifecycle.max_start_attempts.max(1);
        let delay = self.config.lifecycle.retry_delay();

        let mut attempt = 1;
        loop {
            match self.try_start().await {
                Ok(server) => return Ok(server),
                Err(e) => {
                    self.set_state(LifecycleState::Stopped);
                    log::error!("Startup attempt {}/{} failed: {}", attempt, attempts, e);
                    if attempt >= attempts {
                        log::error!("Server failed to start after {} attempts", attempts);
                        return Err(StartupError::RetriesExhausted {
                            attempts,
                            delay,
                            last: Box::new(e),
                        });
                    }
                    log::info!("Retrying startup in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Start (with retries) and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        let server = self.start().await?;
        server.serve(shutdown).await;
        Ok(())
    }
}

/// Entry point used by the binary
pub async fn run_with_retries<F>(config: IngestdConfig, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    LifecycleManager::new(config).run(shutdown).await
}

/// A server that has completed startup and is ready to accept
pub struct BoundServer {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    worker: WriterWorker,
    pid_file: PidFile,
    state: Arc<watch::Sender<LifecycleState>>,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.ctx.local_addr
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Accept connections until `shutdown` resolves, then flush and clean up.
    ///
    /// Connections already being handled are left to finish on their own.
    pub async fn serve<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let BoundServer { listener, ctx, worker, pid_file, state } = self;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        tokio::spawn(handle_connection(stream, remote, Arc::clone(&ctx)));
                    }
                    Err(e) => {
                        log::error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        state.send_replace(LifecycleState::ShuttingDown);
        log::info!("Shutting down, no longer accepting connections");
        drop(listener);

        let grace = ctx.config.lifecycle.shutdown_grace();
        let pending = ctx.queue.len();
        match tokio::time::timeout(grace, ctx.queue.flush()).await {
            Ok(Ok(())) => log::info!("Flushed {} queued records", pending),
            Ok(Err(e)) => log::error!("Failed to flush write queue: {}", e),
            Err(_) => log::warn!(
                "Write queue not drained within {:?}, {} records may be lost",
                grace,
                ctx.queue.len()
            ),
        }

        pid_file.remove();
        if worker.is_running() {
            log::debug!("Writer worker left running for in-flight connections");
        }
        drop(worker);
        state.send_replace(LifecycleState::Stopped);
        log::info!("Server stopped");
    }
}
