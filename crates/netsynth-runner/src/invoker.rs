//! Subprocess execution for the synthesis tool.
//!
//! [`ToolInvoker::run`] starts the tool inside a [`Workspace`], drains stdout
//! and stderr concurrently into bounded buffers, and races process exit
//! against a wall-clock deadline. On the deadline the whole process group is
//! killed, so helper processes the tool forked die with it.
//!
//! Arguments are passed to `execve` as discrete strings; no shell is
//! involved at any point.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::capture::{self, CapturedOutput, CapturedStream};
use crate::workspace::Workspace;

/// How long to wait for the output pipes to close after the process is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Longest time limit a run accepts; longer requests are clamped to it.
pub const MAX_TOOL_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// How a finished process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Normal exit with a status code.
    Code(i32),
    /// Terminated by a signal (unix).
    Signal(i32),
    /// The exit status could not be determined.
    Unknown,
}

impl ExitKind {
    fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitKind::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitKind::Signal(signal);
            }
        }
        ExitKind::Unknown
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitKind::Code(code) => Some(*code),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitKind::Code(code) => write!(f, "exit code {code}"),
            ExitKind::Signal(signal) => write!(f, "signal {signal}"),
            ExitKind::Unknown => f.write_str("unknown exit status"),
        }
    }
}

/// Result of one tool run.
#[derive(Debug)]
pub enum ToolOutcome {
    /// Exit code 0.
    Success(CapturedOutput),
    /// Nonzero exit code or killed by a signal.
    ToolFailure {
        exit: ExitKind,
        output: CapturedOutput,
    },
    /// The deadline passed and the process was killed.
    TimedOut(CapturedOutput),
    /// The process never started.
    LaunchError(std::io::Error),
}

/// Description of a single tool run, used for logging.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    pub started_at: Instant,
    pub deadline: Instant,
}

impl ToolInvocation {
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Runs one fixed external program with bounded output capture.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    program: PathBuf,
    output_cap: usize,
}

impl ToolInvoker {
    /// `output_cap` bounds the bytes retained per stream.
    pub fn new(program: impl Into<PathBuf>, output_cap: usize) -> Self {
        ToolInvoker {
            program: program.into(),
            output_cap,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs the program in `workspace` with `args`, killing it after `timeout`
    /// (at most [`MAX_TOOL_TIMEOUT`]).
    ///
    /// Whatever way the tool ends, its process group is killed before this
    /// returns, so nothing it forked outlives the run.
    pub async fn run(&self, workspace: &Workspace, args: &[OsString], timeout: Duration) -> ToolOutcome {
        let timeout = timeout.min(MAX_TOOL_TIMEOUT);
        let started_at = Instant::now();
        let invocation = ToolInvocation {
            program: self.program.clone(),
            args: args.to_vec(),
            working_dir: workspace.path().to_path_buf(),
            started_at,
            deadline: started_at.checked_add(timeout).unwrap_or(started_at),
        };

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::error!(
                    command = %invocation.command_line(),
                    error = %err,
                    "failed to launch synthesis tool"
                );
                return ToolOutcome::LaunchError(err);
            }
        };
        tracing::info!(
            command = %invocation.command_line(),
            pid = child.id(),
            timeout_ms = timeout.as_millis() as u64,
            "synthesis tool started"
        );

        // The pid doubles as the process group id; `child.id()` is gone once reaped.
        let pgid = child.id();
        let stdout = StreamCapture::spawn(child.stdout.take(), self.output_cap);
        let stderr = StreamCapture::spawn(child.stderr.take(), self.output_cap);

        let deadline = tokio::time::Instant::from_std(invocation.deadline);
        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep_until(deadline) => None,
        };

        let exit = match status {
            Some(Ok(status)) => Some(ExitKind::from_status(status)),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "failed to wait for synthesis tool");
                Some(ExitKind::Unknown)
            }
            None => None,
        };
        terminate(&mut child, pgid).await;

        let output = CapturedOutput {
            stdout: stdout.collect().await,
            stderr: stderr.collect().await,
            elapsed: started_at.elapsed(),
        };
        let elapsed_ms = output.elapsed.as_millis() as u64;

        match exit {
            Some(ExitKind::Code(0)) => {
                tracing::info!(elapsed_ms, "synthesis tool finished");
                ToolOutcome::Success(output)
            }
            Some(exit) => {
                tracing::info!(elapsed_ms, %exit, "synthesis tool failed");
                ToolOutcome::ToolFailure { exit, output }
            }
            None => {
                tracing::warn!(elapsed_ms, "synthesis tool timed out and was killed");
                ToolOutcome::TimedOut(output)
            }
        }
    }
}

/// Kills the process group (unix) and, if still running, the child itself,
/// then reaps it.
///
/// Also called after a normal exit: the group id stays reserved while any
/// member survives, and killing an empty group is a no-op.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid {
            // SAFETY: killpg has no memory-safety preconditions. The group id
            // is the child's pid because it was spawned with `process_group(0)`.
            let killed = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
            if killed == 0 {
                tracing::debug!(pgid, "killed synthesis tool process group");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;

    // `id()` is `None` once the child has been reaped.
    if child.id().is_some() {
        if let Err(err) = child.kill().await {
            tracing::debug!(error = %err, "kill after deadline");
        }
    }
}

/// A running drain of one output pipe.
struct StreamCapture {
    handle: JoinHandle<CapturedStream>,
    stop: oneshot::Sender<()>,
}

impl StreamCapture {
    fn spawn<R>(reader: Option<R>, cap: usize) -> Self
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let (stop, stopped) = oneshot::channel();
        StreamCapture {
            handle: tokio::spawn(capture::drain(reader, cap, stopped)),
            stop,
        }
    }

    /// Waits for EOF, or cuts the capture off after [`DRAIN_GRACE`] keeping
    /// what was read.
    async fn collect(self) -> CapturedStream {
        let StreamCapture { mut handle, stop } = self;
        let finished = match tokio::time::timeout(DRAIN_GRACE, &mut handle).await {
            Ok(finished) => finished,
            Err(_) => {
                // A descendant that left the process group still holds the pipe.
                let _ = stop.send(());
                handle.await
            }
        };
        finished.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "stream capture task failed");
            CapturedStream::default()
        })
    }
}
