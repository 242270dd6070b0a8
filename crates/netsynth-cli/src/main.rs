//! Netsynth command-line front end.
//!
//! Provides the `netsynth` binary, which runs a Verilog file through the same
//! `netsynth_runner::Synthesizer` pipeline the HTTP server uses and prints the
//! resulting netlist as JSON on stdout. Tool logs go to stderr.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};

use netsynth_runner::{
    CapturedOutput, SynthesisOptions, SynthesisOutcome, Synthesizer, ToolInvoker,
    WorkspaceManager,
};

/// Per-stream capture limit for tool output.
const OUTPUT_CAP_BYTES: usize = 1024 * 1024;

/// Yosys synthesis front end.
#[derive(Parser)]
#[command(name = "netsynth", about = "Synthesize Verilog to a gate-level netlist")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Synthesize a Verilog file and print its netlist as JSON.
    Synth {
        /// Verilog source file.
        file: PathBuf,

        /// Flatten the design hierarchy before mapping.
        #[arg(long)]
        flatten: bool,

        /// Top-level module (default: auto-detect).
        #[arg(long)]
        top: Option<String>,

        /// Yosys executable.
        #[arg(long, default_value = "yosys")]
        yosys: PathBuf,

        /// Kill the tool after this many seconds.
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        /// Print only the netlist statistics.
        #[arg(long)]
        stats_only: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth {
            file,
            flatten,
            top,
            yosys,
            timeout_secs,
            stats_only,
        } => {
            let options = SynthesisOptions { flatten, top };
            let exit_code = run_synth(
                file,
                options,
                yosys,
                Duration::from_secs(timeout_secs.max(1)),
                stats_only,
            )
            .await;
            process::exit(exit_code);
        }
    }
}

/// Execute the synth subcommand.
///
/// Returns exit code: 0 = success, 1 = synthesis failure or timeout,
/// 2 = launch, usage or I/O error.
async fn run_synth(
    file: PathBuf,
    options: SynthesisOptions,
    yosys: PathBuf,
    timeout: Duration,
    stats_only: bool,
) -> i32 {
    let source = match tokio::fs::read_to_string(&file).await {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", file.display(), e);
            return 2;
        }
    };

    let synthesizer = Synthesizer::new(
        WorkspaceManager::in_system_temp(),
        ToolInvoker::new(yosys, OUTPUT_CAP_BYTES),
    );

    let outcome = match synthesizer.synthesize(&source, &options, timeout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    match outcome {
        SynthesisOutcome::Synthesized(report) => {
            let value = if stats_only {
                serde_json::to_value(&report.stats)
            } else {
                serde_json::to_value(&report.netlist).map(|mut netlist| {
                    netlist["stats"] = serde_json::to_value(&report.stats).unwrap_or_default();
                    netlist
                })
            };
            match value.and_then(|v| serde_json::to_string_pretty(&v)) {
                Ok(json) => {
                    println!("{}", json);
                    0
                }
                Err(e) => {
                    eprintln!("Error: failed to serialize netlist: {}", e);
                    2
                }
            }
        }
        SynthesisOutcome::ToolFailure { exit, output } => {
            dump_logs(&output);
            eprintln!("Synthesis failed: {}", exit);
            1
        }
        SynthesisOutcome::MissingNetlist { output } => {
            dump_logs(&output);
            eprintln!("Synthesis failed: the tool wrote no netlist");
            1
        }
        SynthesisOutcome::InvalidNetlist { reason, output } => {
            dump_logs(&output);
            eprintln!("Synthesis failed: unreadable netlist: {}", reason);
            1
        }
        SynthesisOutcome::TimedOut { timeout, output } => {
            dump_logs(&output);
            eprintln!("Synthesis timed out after {}s", timeout.as_secs());
            1
        }
    }
}

/// Forward the captured tool output to stderr.
fn dump_logs(output: &CapturedOutput) {
    for stream in [&output.stdout, &output.stderr] {
        if stream.is_empty() {
            continue;
        }
        if stream.truncated {
            eprintln!("[... {} earlier bytes omitted ...]", stream.total_bytes - stream.bytes.len() as u64);
        }
        eprint!("{}", stream.text());
    }
}
