//! Ingestion counters
//!
//! Plain relaxed atomics: each counter is independent and only read for
//! `/status`, so no cross-field ordering is needed.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: AtomicU64,
    rejected_full: AtomicU64,
    rejected_client: AtomicU64,
    internal_errors: AtomicU64,
    written: AtomicU64,
    write_errors: AtomicU64,
    rotations: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStatsSnapshot {
    pub accepted: u64,
    pub rejected_full: u64,
    pub rejected_client: u64,
    pub internal_errors: u64,
    pub written: u64,
    pub write_errors: u64,
    pub rotations: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_full(&self) {
        self.rejected_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_client(&self) {
        self.rejected_client.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_internal_error(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self, rotated: bool) {
        self.written.fetch_add(1, Ordering::Relaxed);
        if rotated {
            self.rotations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_full: self.rejected_full.load(Ordering::Relaxed),
            rejected_client: self.rejected_client.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
        }
    }
}
