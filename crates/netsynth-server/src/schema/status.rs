//! API schema types for `GET /status`.

use serde::Serialize;

use crate::concurrency::{AdmissionSnapshot, JobView};

/// Response body for `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub admission: AdmissionSnapshot,
    /// Jobs currently queued or running, oldest first.
    pub active_jobs: Vec<JobView>,
}
