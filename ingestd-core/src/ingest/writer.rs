//! Writer worker
//!
//! The single consumer of the write queue. Runs on its own OS thread so disk
//! I/O never blocks the async runtime, and so that all appends are applied in
//! dequeue order with no two writes ever interleaving.

use super::queue::{QueueReceiver, WriteCommand};
use super::stats::IngestStats;
use crate::store::AppendLogStore;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Thread name, visible in debuggers and panic messages
pub const WRITER_THREAD_NAME: &str = "ingest-writer";

/// Handle to the running writer thread
pub struct WriterWorker {
    handle: Option<JoinHandle<()>>,
}

impl WriterWorker {
    /// Start draining `rx` into `store`.
    pub fn spawn(
        mut rx: QueueReceiver,
        store: AppendLogStore,
        stats: Arc<IngestStats>,
    ) -> std::io::Result<Self> {
        let handle = std::thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || {
                log::debug!("Writer worker started for {}", store.dir().display());
                while let Some(command) = rx.blocking_recv() {
                    match command {
                        WriteCommand::Append(record) => match store.append(&record) {
                            Ok(outcome) => {
                                if outcome.rotated {
                                    log::info!("Rotated log for {}", record.source);
                                }
                                stats.record_written(outcome.rotated);
                            }
                            Err(e) => {
                                // The record is dropped; the worker keeps going
                                log::error!("Background write failed for {}: {}", record.source, e);
                                stats.record_write_error();
                            }
                        },
                        WriteCommand::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
                log::debug!("Writer worker stopped: queue closed");
            })?;

        Ok(Self { handle: Some(handle) })
    }

    /// True while the thread is still draining
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the thread to exit. Only returns once every queue handle is dropped.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Writer worker panicked");
            }
        }
    }
}
