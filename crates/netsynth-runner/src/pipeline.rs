//! End-to-end synthesis of one design.
//!
//! [`Synthesizer::synthesize`] runs the full flow for one request:
//! validate options -> acquire workspace -> stage source and script -> run
//! the tool -> read and transform `out.json` -> release workspace. The
//! workspace is released exactly once, after the outcome is fully built and
//! whatever the outcome is.

use std::time::Duration;

use tokio::io::AsyncReadExt;

use netsynth_netlist::{compute_stats, netlist_from_json, Netlist, NetlistStats};

use crate::capture::CapturedOutput;
use crate::error::RunnerError;
use crate::invoker::{ExitKind, ToolInvoker, ToolOutcome};
use crate::script::{self, SynthesisOptions, INPUT_FILE, OUTPUT_FILE, SCRIPT_FILE};
use crate::workspace::{Workspace, WorkspaceManager};

/// A successful synthesis run.
#[derive(Debug, Clone)]
pub struct SynthesisReport {
    pub netlist: Netlist,
    pub stats: NetlistStats,
    pub output: CapturedOutput,
}

/// Every way a synthesis run that actually started the tool can end.
#[derive(Debug, Clone)]
pub enum SynthesisOutcome {
    /// Exit code 0 and a readable netlist.
    Synthesized(SynthesisReport),
    /// The tool rejected the design.
    ToolFailure {
        exit: ExitKind,
        output: CapturedOutput,
    },
    /// The tool exited 0 without writing `out.json`.
    MissingNetlist { output: CapturedOutput },
    /// `out.json` exists but could not be read or parsed.
    InvalidNetlist {
        reason: String,
        output: CapturedOutput,
    },
    /// The tool hit the deadline and was killed.
    TimedOut {
        timeout: Duration,
        output: CapturedOutput,
    },
}

/// Default upper bound on the size of `out.json`.
pub const DEFAULT_MAX_NETLIST_BYTES: u64 = 64 * 1024 * 1024;

/// Runs Yosys against staged designs.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    workspaces: WorkspaceManager,
    invoker: ToolInvoker,
    max_netlist_bytes: u64,
}

impl Synthesizer {
    pub fn new(workspaces: WorkspaceManager, invoker: ToolInvoker) -> Self {
        Synthesizer {
            workspaces,
            invoker,
            max_netlist_bytes: DEFAULT_MAX_NETLIST_BYTES,
        }
    }

    /// Netlists larger than `limit` bytes are reported as invalid, unread.
    pub fn with_max_netlist_bytes(mut self, limit: u64) -> Self {
        self.max_netlist_bytes = limit;
        self
    }

    /// Synthesizes `source` with `options`, bounded by `timeout`.
    pub async fn synthesize(
        &self,
        source: &str,
        options: &SynthesisOptions,
        timeout: Duration,
    ) -> Result<SynthesisOutcome, RunnerError> {
        options.validate()?;

        let workspace = self.workspaces.acquire()?;
        let result = self.run_in(&workspace, source, options, timeout).await;
        workspace.release();
        result
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        source: &str,
        options: &SynthesisOptions,
        timeout: Duration,
    ) -> Result<SynthesisOutcome, RunnerError> {
        tracing::debug!(
            workspace = %workspace.id(),
            path = %workspace.path().display(),
            "staging design"
        );
        workspace.stage(INPUT_FILE, source.as_bytes()).await?;
        workspace
            .stage(SCRIPT_FILE, options.render_script().as_bytes())
            .await?;

        let output = match self.invoker.run(workspace, &script::tool_args(), timeout).await {
            ToolOutcome::Success(output) => output,
            ToolOutcome::ToolFailure { exit, output } => {
                return Ok(SynthesisOutcome::ToolFailure { exit, output })
            }
            ToolOutcome::TimedOut(output) => {
                return Ok(SynthesisOutcome::TimedOut { timeout, output })
            }
            ToolOutcome::LaunchError(source) => {
                return Err(RunnerError::Launch {
                    program: self.invoker.program().to_path_buf(),
                    source,
                })
            }
        };

        let bytes = match self.read_netlist(workspace).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("synthesis tool exited cleanly without writing a netlist");
                return Ok(SynthesisOutcome::MissingNetlist { output });
            }
            Err(err) => {
                return Ok(SynthesisOutcome::InvalidNetlist {
                    reason: format!("failed to read {OUTPUT_FILE}: {err}"),
                    output,
                })
            }
        };

        // Parsing a large netlist is CPU-bound; keep it off the async workers.
        let parsed = tokio::task::spawn_blocking(move || {
            netlist_from_json(&bytes).map(|netlist| {
                let stats = compute_stats(&netlist);
                (netlist, stats)
            })
        })
        .await;

        match parsed {
            Ok(Ok((netlist, stats))) => Ok(SynthesisOutcome::Synthesized(SynthesisReport {
                netlist,
                stats,
                output,
            })),
            Ok(Err(err)) => Ok(SynthesisOutcome::InvalidNetlist {
                reason: err.to_string(),
                output,
            }),
            Err(err) => Ok(SynthesisOutcome::InvalidNetlist {
                reason: format!("netlist transform panicked: {err}"),
                output,
            }),
        }
    }
}

impl Synthesizer {
    /// Reads `out.json`, refusing files over the configured limit.
    async fn read_netlist(&self, workspace: &Workspace) -> std::io::Result<Vec<u8>> {
        let limit = self.max_netlist_bytes;
        let file = tokio::fs::File::open(workspace.file(OUTPUT_FILE)).await?;
        let len = file.metadata().await?.len();
        if len > limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("netlist is {len} bytes, limit is {limit}"),
            ));
        }

        let mut bytes = Vec::with_capacity(len as usize);
        file.take(limit + 1).read_to_end(&mut bytes).await?;
        if bytes.len() as u64 > limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("netlist exceeds {limit} bytes"),
            ));
        }
        Ok(bytes)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use super::*;

    const NETLIST: &str = r#"{"modules":{"inv":{"ports":{"a":{"direction":"input","bits":[2]},"y":{"direction":"output","bits":[3]}},"cells":{"u0":{"type":"$_NOT_","port_directions":{"A":"input","Y":"output"},"connections":{"A":[2],"Y":[3]}}}}}}"#;

    /// Writes an executable fake `yosys` that behaves according to markers in
    /// the staged design.
    fn fake_yosys(dir: &Path) -> PathBuf {
        let path = dir.join("fake-yosys");
        let script = format!(
            "#!/bin/sh\n\
             [ \"$1\" = \"-s\" ] || exit 64\n\
             grep -q 'write_json out.json' \"$2\" || exit 65\n\
             case \"$(cat input.v)\" in\n\
               *FAIL*) echo 'ERROR: syntax error, unexpected endmodule' >&2; exit 2;;\n\
               *HANG*) sleep 30;;\n\
               *NOOUT*) echo 'nothing to do'; exit 0;;\n\
               *GARBAGE*) echo 'not json' > out.json; exit 0;;\n\
             esac\n\
             echo 'End of script.'\n\
             cat > out.json <<'EOF'\n{NETLIST}\nEOF\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    struct Harness {
        _tools: tempfile::TempDir,
        scratch: tempfile::TempDir,
        synthesizer: Synthesizer,
    }

    impl Harness {
        fn new() -> Self {
            let tools = tempfile::tempdir().unwrap();
            let scratch = tempfile::tempdir().unwrap();
            let synthesizer = Synthesizer::new(
                WorkspaceManager::new(scratch.path()),
                ToolInvoker::new(fake_yosys(tools.path()), 64 * 1024),
            );
            Harness {
                _tools: tools,
                scratch,
                synthesizer,
            }
        }

        async fn run(&self, source: &str, timeout: Duration) -> Result<SynthesisOutcome, RunnerError> {
            self.synthesizer
                .synthesize(source, &SynthesisOptions::default(), timeout)
                .await
        }

        fn leftover_workspaces(&self) -> usize {
            std::fs::read_dir(self.scratch.path()).unwrap().count()
        }
    }

    #[tokio::test]
    async fn synthesizes_and_transforms() {
        let harness = Harness::new();
        let outcome = harness.run("module inv; endmodule", Duration::from_secs(10)).await.unwrap();
        match outcome {
            SynthesisOutcome::Synthesized(report) => {
                assert_eq!(report.netlist.gates.len(), 3);
                assert_eq!(report.stats.total_gates, 1);
                assert_eq!(report.output.stdout.text(), "End of script.\n");
            }
            other => panic!("expected netlist, got {other:?}"),
        }
        assert_eq!(harness.leftover_workspaces(), 0);
    }

    #[tokio::test]
    async fn tool_failure_keeps_stderr() {
        let harness = Harness::new();
        let outcome = harness.run("FAIL", Duration::from_secs(10)).await.unwrap();
        match outcome {
            SynthesisOutcome::ToolFailure { exit, output } => {
                assert_eq!(exit, ExitKind::Code(2));
                assert_eq!(
                    output.stderr.text(),
                    "ERROR: syntax error, unexpected endmodule\n"
                );
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(harness.leftover_workspaces(), 0);
    }

    #[tokio::test]
    async fn timeout_cleans_up() {
        let harness = Harness::new();
        let outcome = harness.run("HANG", Duration::from_millis(300)).await.unwrap();
        assert!(matches!(outcome, SynthesisOutcome::TimedOut { .. }));
        assert_eq!(harness.leftover_workspaces(), 0);
    }

    #[tokio::test]
    async fn missing_and_invalid_netlists() {
        let harness = Harness::new();
        let missing = harness.run("NOOUT", Duration::from_secs(10)).await.unwrap();
        assert!(matches!(missing, SynthesisOutcome::MissingNetlist { .. }));
        let invalid = harness.run("GARBAGE", Duration::from_secs(10)).await.unwrap();
        assert!(matches!(invalid, SynthesisOutcome::InvalidNetlist { .. }));
        assert_eq!(harness.leftover_workspaces(), 0);
    }

    #[tokio::test]
    async fn oversized_netlist_is_rejected_unread() {
        let mut harness = Harness::new();
        harness.synthesizer = harness.synthesizer.clone().with_max_netlist_bytes(64);
        let outcome = harness.run("module inv; endmodule", Duration::from_secs(10)).await.unwrap();
        match outcome {
            SynthesisOutcome::InvalidNetlist { reason, .. } => {
                assert!(reason.contains("limit is 64"), "{reason}");
            }
            other => panic!("expected invalid netlist, got {other:?}"),
        }
        assert_eq!(harness.leftover_workspaces(), 0);
    }

    #[tokio::test]
    async fn launch_error_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let synthesizer = Synthesizer::new(
            WorkspaceManager::new(scratch.path()),
            ToolInvoker::new("/nonexistent/yosys", 1024),
        );
        let result = synthesizer
            .synthesize("module m; endmodule", &SynthesisOptions::default(), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(RunnerError::Launch { .. })));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn invalid_options_never_create_a_workspace() {
        let harness = Harness::new();
        let options = SynthesisOptions {
            flatten: false,
            top: Some("a\nb".to_string()),
        };
        let result = harness
            .synthesizer
            .synthesize("module m; endmodule", &options, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(RunnerError::InvalidOption(_))));
        assert_eq!(harness.leftover_workspaces(), 0);
    }
}
