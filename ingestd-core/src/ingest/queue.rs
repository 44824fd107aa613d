//! Bounded write queue
//!
//! A fixed-capacity FIFO between request handlers (many producers) and the
//! writer worker (single consumer). Enqueue never waits: a full queue is
//! reported to the caller immediately.

use super::IngestionRecord;
use crate::error::IngestError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Message for the writer thread
#[derive(Debug)]
pub enum WriteCommand {
    /// Append one record to its source log
    Append(IngestionRecord),
    /// Acknowledge once every earlier command has been processed
    Flush(oneshot::Sender<()>),
}

/// Producer side of the queue; cheap to clone
#[derive(Debug, Clone)]
pub struct WriteQueue {
    tx: mpsc::Sender<WriteCommand>,
}

/// Consumer side, owned by the writer worker
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<WriteCommand>,
}

/// Create a queue holding at most `capacity` commands
pub fn bounded(capacity: usize) -> (WriteQueue, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (WriteQueue { tx }, QueueReceiver { rx })
}

impl WriteQueue {
    /// Non-blocking enqueue; fails with [`IngestError::QueueFull`] when no slot is free.
    pub fn try_enqueue(&self, record: IngestionRecord) -> Result<(), IngestError> {
        match self.tx.try_send(WriteCommand::Append(record)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(IngestError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(IngestError::QueueClosed),
        }
    }

    /// Wait until everything enqueued before this call has been written.
    ///
    /// Unlike enqueue, this waits for a free slot.
    pub async fn flush(&self) -> Result<(), IngestError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Flush(ack_tx))
            .await
            .map_err(|_| IngestError::QueueClosed)?;
        ack_rx.await.map_err(|_| IngestError::QueueClosed)
    }

    /// Commands currently waiting
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl QueueReceiver {
    /// Block the current (non-async) thread until a command arrives.
    ///
    /// Returns `None` once every [`WriteQueue`] handle is dropped and the queue is drained.
    pub fn blocking_recv(&mut self) -> Option<WriteCommand> {
        self.rx.blocking_recv()
    }

    pub async fn recv(&mut self) -> Option<WriteCommand> {
        self.rx.recv().await
    }
}
