//! Concurrency infrastructure for synthesis jobs.
//!
//! - [`admission::AdmissionController`] bounds concurrent tool runs
//! - [`jobs::JobRegistry`] tracks live jobs for the status endpoint

pub mod admission;
pub mod jobs;

pub use admission::{
    AdmissionController, AdmissionError, AdmissionMode, AdmissionPermit, AdmissionSnapshot,
};
pub use jobs::{JobId, JobPhase, JobRegistry, JobTicket, JobView};
