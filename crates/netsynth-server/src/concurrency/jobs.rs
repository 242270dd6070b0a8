//! Registry of synthesis jobs that are waiting or running.
//!
//! Entries exist only while a job is alive: [`JobRegistry::track`] returns a
//! [`JobTicket`] guard and dropping the ticket removes the entry. Nothing
//! about a job outlives its request.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique job identifier (UUID v4 newtype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle phase of a live job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    /// Waiting for an admission slot.
    Queued,
    /// Holding a slot; the tool is being run.
    Running,
}

#[derive(Debug, Clone)]
struct JobRecord {
    phase: JobPhase,
    submitted_at: Instant,
}

/// Serializable view of a live job.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub phase: JobPhase,
    pub age_ms: u64,
}

/// Live jobs keyed by id. Backed by `DashMap` for lock-free access from
/// concurrent handler tasks.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<JobId, JobRecord>,
}

impl JobRegistry {
    pub fn new() -> Self {
        JobRegistry {
            jobs: DashMap::new(),
        }
    }

    /// Registers a new queued job.
    pub fn track(self: &Arc<Self>) -> JobTicket {
        let id = JobId::new();
        self.jobs.insert(
            id,
            JobRecord {
                phase: JobPhase::Queued,
                submitted_at: Instant::now(),
            },
        );
        JobTicket {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Live jobs, oldest first.
    pub fn list(&self) -> Vec<JobView> {
        let now = Instant::now();
        let mut views: Vec<(Instant, JobView)> = self
            .jobs
            .iter()
            .map(|entry| {
                let record = entry.value();
                (
                    record.submitted_at,
                    JobView {
                        job_id: *entry.key(),
                        phase: record.phase,
                        age_ms: now.duration_since(record.submitted_at).as_millis() as u64,
                    },
                )
            })
            .collect();
        views.sort_by_key(|(submitted_at, _)| *submitted_at);
        views.into_iter().map(|(_, view)| view).collect()
    }
}

/// Registration guard for one job.
#[derive(Debug)]
pub struct JobTicket {
    id: JobId,
    registry: Arc<JobRegistry>,
}

impl JobTicket {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn set_phase(&self, phase: JobPhase) {
        if let Some(mut record) = self.registry.jobs.get_mut(&self.id) {
            record.phase = phase;
        }
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        self.registry.jobs.remove(&self.id);
    }
}
