//! Yosys script template.
//!
//! The tool is always run as `yosys -s synth.ys` with a script generated from
//! a fixed template. Caller options only toggle template lines; the one free
//! text value (`top`) is restricted to a plain Verilog identifier before it
//! is written into the script.

use std::ffi::OsString;

use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

/// Staged design source.
pub const INPUT_FILE: &str = "input.v";
/// Staged Yosys script.
pub const SCRIPT_FILE: &str = "synth.ys";
/// Netlist written by the script.
pub const OUTPUT_FILE: &str = "out.json";

const MAX_TOP_LEN: usize = 128;

/// Caller-selectable synthesis options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Flatten the design hierarchy (`synth -flatten`).
    #[serde(default)]
    pub flatten: bool,
    /// Top-level module (`synth -top <name>`); auto-detected when absent.
    #[serde(default)]
    pub top: Option<String>,
}

impl SynthesisOptions {
    pub fn validate(&self) -> Result<(), RunnerError> {
        if let Some(top) = &self.top {
            if !is_identifier(top) {
                return Err(RunnerError::InvalidOption(format!(
                    "top must be a simple Verilog identifier of at most {MAX_TOP_LEN} characters"
                )));
            }
        }
        Ok(())
    }

    /// Renders the script. Call [`validate`](Self::validate) first.
    pub fn render_script(&self) -> String {
        let mut synth = String::from("synth");
        if let Some(top) = &self.top {
            synth.push_str(" -top ");
            synth.push_str(top);
        }
        if self.flatten {
            synth.push_str(" -flatten");
        }
        format!("read_verilog {INPUT_FILE}\n{synth}\nwrite_json {OUTPUT_FILE}\n")
    }
}

/// Command-line arguments for the tool; always the same.
pub fn tool_args() -> Vec<OsString> {
    vec![OsString::from("-s"), OsString::from(SCRIPT_FILE)]
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_TOP_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
