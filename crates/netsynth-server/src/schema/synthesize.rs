//! API schema types for `POST /synthesize`.

use serde::{Deserialize, Serialize};

use netsynth_netlist::{Gate, NetlistStats, Wire};
use netsynth_runner::{CapturedOutput, SynthesisOptions};

/// Caller-selectable Yosys settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisSettings {
    /// Flatten the hierarchy before mapping (default: false).
    #[serde(default)]
    pub flatten: bool,
    /// Top-level module name (default: auto-detect).
    #[serde(default)]
    pub top: Option<String>,
    /// Per-request time limit, capped at the server maximum.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SynthesisSettings {
    pub fn options(&self) -> SynthesisOptions {
        SynthesisOptions {
            flatten: self.flatten,
            top: self.top.clone(),
        }
    }
}

/// JSON request body for `POST /synthesize`.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizeRequest {
    /// Verilog design source.
    #[serde(default)]
    pub verilog: String,
    #[serde(default, alias = "options")]
    pub yosys_settings: SynthesisSettings,
}

/// Query parameters accepted with a `text/plain` body.
pub type SynthesisQuery = SynthesisSettings;

/// Tail of the tool's output streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogExcerpt {
    pub stdout: String,
    pub stderr: String,
    /// `true` if `stdout` is not the complete stream.
    pub stdout_truncated: bool,
    /// `true` if `stderr` is not the complete stream.
    pub stderr_truncated: bool,
}

impl LogExcerpt {
    /// Keeps the last `max_chars` characters of each stream.
    pub fn from_output(output: &CapturedOutput, max_chars: usize) -> Self {
        let (stdout, stdout_truncated) = output.stdout.tail(max_chars);
        let (stderr, stderr_truncated) = output.stderr.tail(max_chars);
        LogExcerpt {
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
        }
    }
}

/// Response body for a successful synthesis.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizeResponse {
    /// Always `true`.
    pub success: bool,
    pub job_id: String,
    pub gates: Vec<Gate>,
    pub wires: Vec<Wire>,
    pub stats: NetlistStats,
    pub log: LogExcerpt,
    /// Wall-clock time of the tool run in milliseconds.
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use netsynth_runner::CapturedStream;

    use super::*;

    #[test]
    fn request_defaults_and_alias() {
        let req: SynthesizeRequest = serde_json::from_str(r#"{"verilog": "module m; endmodule"}"#).unwrap();
        assert!(!req.yosys_settings.flatten);
        assert!(req.yosys_settings.top.is_none());

        let req: SynthesizeRequest =
            serde_json::from_str(r#"{"verilog": "x", "options": {"flatten": true, "top": "m"}}"#)
                .unwrap();
        assert_eq!(
            req.yosys_settings.options(),
            SynthesisOptions {
                flatten: true,
                top: Some("m".to_string())
            }
        );
    }

    #[test]
    fn unknown_settings_are_rejected() {
        let result: Result<SynthesizeRequest, _> =
            serde_json::from_str(r#"{"verilog": "x", "yosys_settings": {"script": "shell"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn excerpt_keeps_tail() {
        let output = CapturedOutput {
            stdout: CapturedStream {
                bytes: b"line one\nline two\n".to_vec(),
                total_bytes: 18,
                truncated: false,
            },
            stderr: CapturedStream::default(),
            elapsed: Duration::from_millis(5),
        };
        let excerpt = LogExcerpt::from_output(&output, 9);
        assert_eq!(excerpt.stdout, "line two\n");
        assert!(excerpt.stdout_truncated);
        assert_eq!(excerpt.stderr, "");
        assert!(!excerpt.stderr_truncated);
    }
}
