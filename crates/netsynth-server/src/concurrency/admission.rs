//! Admission control for synthesis jobs.
//!
//! [`AdmissionController`] bounds the number of tool runs in flight. A
//! request that finds every slot taken either waits in a bounded FIFO queue
//! ([`AdmissionMode::Queue`]) or is turned away at once
//! ([`AdmissionMode::Reject`]).
//!
//! Slots are `tokio::sync::Semaphore` permits, so the in-flight count can
//! never exceed capacity, and the semaphore's fair queueing gives FIFO order
//! among waiters. Queue length is tracked with an atomic reservation so the
//! bound holds under concurrent admits. Both counters are restored by `Drop`
//! guards, which also covers requests whose futures are cancelled while they
//! wait.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// What happens to a request when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionMode {
    /// Wait for a slot, up to the queue depth and queue timeout.
    Queue,
    /// Reject immediately.
    Reject,
}

impl FromStr for AdmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queue" => Ok(AdmissionMode::Queue),
            "reject" => Ok(AdmissionMode::Reject),
            other => Err(format!("unknown admission mode '{other}'")),
        }
    }
}

/// Why a request was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// Reject mode and every slot is taken.
    #[error("server busy: all {capacity} synthesis slots are in use")]
    Busy { capacity: usize },

    /// Queue mode and the wait queue is full.
    #[error("server busy: synthesis queue is full ({depth} waiting)")]
    QueueFull { depth: usize },

    /// Queue mode and no slot freed up in time.
    #[error("server busy: no synthesis slot became free within {waited_secs}s")]
    QueueTimeout { waited_secs: u64 },

    /// The controller was shut down.
    #[error("admission closed")]
    Closed,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionSnapshot {
    pub mode: AdmissionMode,
    pub capacity: usize,
    pub in_flight: usize,
    pub queued: usize,
    pub queue_depth: usize,
    /// Highest in-flight count observed since start.
    pub peak_in_flight: usize,
}

/// Bounds concurrent synthesis runs.
#[derive(Debug)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    queue_depth: usize,
    mode: AdmissionMode,
    queue_timeout: Duration,
    in_flight: Arc<AtomicUsize>,
    queued: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl AdmissionController {
    /// Creates a controller with `capacity` slots (at least one).
    pub fn new(
        capacity: usize,
        mode: AdmissionMode,
        queue_depth: usize,
        queue_timeout: Duration,
    ) -> Self {
        let capacity = capacity.max(1);
        AdmissionController {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_depth,
            mode,
            queue_timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
            queued: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn mode(&self) -> AdmissionMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admits a request according to the configured mode.
    ///
    /// In queue mode this waits at most the queue timeout.
    pub async fn admit(&self) -> Result<AdmissionPermit, AdmissionError> {
        match self.try_admit() {
            Ok(permit) => return Ok(permit),
            Err(AdmissionError::Busy { .. }) if self.mode == AdmissionMode::Queue => {}
            Err(err) => return Err(err),
        }

        let _slot = self.reserve_queue_slot()?;
        tracing::debug!(queued = self.queued.load(Ordering::SeqCst), "waiting for a synthesis slot");

        match tokio::time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(self.grant(permit)),
            Ok(Err(_)) => Err(AdmissionError::Closed),
            Err(_) => Err(AdmissionError::QueueTimeout {
                waited_secs: self.queue_timeout.as_secs(),
            }),
        }
    }

    /// Admits only if a slot is free right now.
    fn try_admit(&self) -> Result<AdmissionPermit, AdmissionError> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Ok(self.grant(permit)),
            Err(TryAcquireError::Closed) => Err(AdmissionError::Closed),
            Err(TryAcquireError::NoPermits) => Err(AdmissionError::Busy {
                capacity: self.capacity,
            }),
        }
    }

    /// Stops admitting; waiting requests fail with [`AdmissionError::Closed`].
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            mode: self.mode,
            capacity: self.capacity,
            in_flight: self.in_flight.load(Ordering::SeqCst),
            queued: self.queued.load(Ordering::SeqCst),
            queue_depth: self.queue_depth,
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
        }
    }

    fn grant(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        AdmissionPermit {
            in_flight: Arc::clone(&self.in_flight),
            _permit: permit,
        }
    }

    fn reserve_queue_slot(&self) -> Result<QueueSlot<'_>, AdmissionError> {
        self.queued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |queued| {
                (queued < self.queue_depth).then_some(queued + 1)
            })
            .map_err(|_| AdmissionError::QueueFull {
                depth: self.queue_depth,
            })?;
        Ok(QueueSlot {
            queued: &self.queued,
        })
    }
}

/// A held execution slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    in_flight: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit is returned, so the counter never
        // overshoots capacity.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct QueueSlot<'a> {
    queued: &'a AtomicUsize,
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }
}
