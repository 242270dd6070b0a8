//! Synthesis job orchestration behind the HTTP handlers.
//!
//! [`SynthesisService::submit`] takes an already validated design through
//! admission, runs it on a detached tokio task and converts the outcome into
//! a response. The task owns the admission permit, the job ticket and
//! (through the runner) the workspace, so a client that disconnects halfway
//! does not cut the run short or leak the slot or the scratch directory.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use netsynth_runner::{
    CapturedOutput, SynthesisOptions, SynthesisOutcome, Synthesizer, ToolInvoker, WorkspaceManager,
};

use crate::concurrency::{AdmissionController, JobPhase, JobRegistry};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::schema::status::StatusResponse;
use crate::schema::synthesize::{LogExcerpt, SynthesizeResponse};

/// A validated synthesis request.
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub source: String,
    pub options: SynthesisOptions,
    pub timeout: Duration,
}

/// Runs synthesis jobs under admission control.
pub struct SynthesisService {
    synthesizer: Arc<Synthesizer>,
    admission: Arc<AdmissionController>,
    jobs: Arc<JobRegistry>,
    log_excerpt_chars: usize,
}

impl SynthesisService {
    pub fn new(
        synthesizer: Synthesizer,
        admission: Arc<AdmissionController>,
        log_excerpt_chars: usize,
    ) -> Self {
        SynthesisService {
            synthesizer: Arc::new(synthesizer),
            admission,
            jobs: Arc::new(JobRegistry::new()),
            log_excerpt_chars,
        }
    }

    /// Builds the service and its collaborators from configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        let synthesizer = Synthesizer::new(
            WorkspaceManager::new(&config.scratch_dir),
            ToolInvoker::new(&config.yosys_bin, config.output_cap_bytes),
        )
        .with_max_netlist_bytes(config.max_netlist_bytes);
        let admission = Arc::new(AdmissionController::new(
            config.max_concurrent,
            config.admission_mode,
            config.queue_depth,
            config.queue_timeout,
        ));
        Self::new(synthesizer, admission, config.log_excerpt_chars)
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn jobs(&self) -> &Arc<JobRegistry> {
        &self.jobs
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            admission: self.admission.snapshot(),
            active_jobs: self.jobs.list(),
        }
    }

    /// Admits and runs one job, returning the response payload.
    pub async fn submit(&self, job: SynthesisJob) -> Result<SynthesizeResponse, ApiError> {
        let ticket = self.jobs.track();
        let job_id = ticket.id();
        let span = tracing::info_span!("synthesis", %job_id);

        let permit = self.admission.admit().instrument(span.clone()).await.map_err(|err| {
            tracing::warn!(parent: &span, error = %err, "synthesis request not admitted");
            ApiError::from(err)
        })?;
        ticket.set_phase(JobPhase::Running);

        let synthesizer = Arc::clone(&self.synthesizer);
        let handle = tokio::spawn(
            async move {
                let _permit = permit;
                let _ticket = ticket;
                tracing::info!(bytes = job.source.len(), "synthesis job started");
                synthesizer
                    .synthesize(&job.source, &job.options, job.timeout)
                    .await
            }
            .instrument(span.clone()),
        );

        let outcome = handle
            .await
            .map_err(|err| {
                ApiError::InternalError(format!("synthesis task {job_id} failed: {err}"))
            })??;

        let _entered = span.enter();
        self.respond(job_id.to_string(), outcome)
    }

    fn respond(
        &self,
        job_id: String,
        outcome: SynthesisOutcome,
    ) -> Result<SynthesizeResponse, ApiError> {
        let excerpt =
            |output: &CapturedOutput| LogExcerpt::from_output(output, self.log_excerpt_chars);

        match outcome {
            SynthesisOutcome::Synthesized(report) => {
                tracing::info!(
                    gates = report.stats.total_gates,
                    elapsed_ms = report.output.elapsed.as_millis() as u64,
                    "synthesis succeeded"
                );
                Ok(SynthesizeResponse {
                    success: true,
                    job_id,
                    log: excerpt(&report.output),
                    elapsed_ms: report.output.elapsed.as_millis() as u64,
                    gates: report.netlist.gates,
                    wires: report.netlist.wires,
                    stats: report.stats,
                })
            }
            SynthesisOutcome::ToolFailure { exit, output } => Err(ApiError::SynthesisFailed {
                exit: exit.to_string(),
                exit_code: exit.code(),
                logs: excerpt(&output),
            }),
            SynthesisOutcome::MissingNetlist { output } => Err(ApiError::BadToolOutput {
                reason: "tool exited cleanly without writing a netlist".to_string(),
                logs: excerpt(&output),
            }),
            SynthesisOutcome::InvalidNetlist { reason, output } => Err(ApiError::BadToolOutput {
                reason,
                logs: excerpt(&output),
            }),
            SynthesisOutcome::TimedOut { timeout, output } => Err(ApiError::Timeout {
                timeout_secs: timeout.as_secs(),
                logs: excerpt(&output),
            }),
        }
    }
}
