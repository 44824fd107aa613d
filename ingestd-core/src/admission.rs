//! Connection admission limiter
//!
//! A counting semaphore that bounds how many accepted connections are being
//! handled at once. Excess connections are still accepted by the listener;
//! their handling task simply waits in [`ConnectionLimiter::acquire`] until a
//! slot frees up. Nothing is rejected at this layer.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
struct Counters {
    active: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicU64,
}

/// Shared limiter; clones refer to the same slots
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    max: usize,
}

/// One admission slot, released when dropped
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

/// Limiter counters for `/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionSnapshot {
    pub active: usize,
    pub max: usize,
    pub peak: usize,
    pub total: u64,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            counters: Arc::new(Counters {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                total: AtomicU64::new(0),
            }),
            max,
        }
    }

    /// Wait for a free slot.
    ///
    /// Returns `None` only if the semaphore was closed.
    pub async fn acquire(&self) -> Option<AdmissionPermit> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok()?;
        Some(self.admit(permit))
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        Some(self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let active = self.counters.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak.fetch_max(active, Ordering::AcqRel);
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        AdmissionPermit { _permit: permit, counters: Arc::clone(&self.counters) }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            active: self.counters.active.load(Ordering::Acquire),
            max: self.max,
            peak: self.counters.peak.load(Ordering::Acquire),
            total: self.counters.total.load(Ordering::Relaxed),
        }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::AcqRel);
    }
}
