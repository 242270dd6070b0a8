//! Errors produced while reading Yosys netlists.

use thiserror::Error;

/// Errors produced by the netlist crate.
#[derive(Debug, Error)]
pub enum NetlistError {
    /// The document is not valid JSON or does not match the Yosys schema.
    #[error("malformed yosys json: {0}")]
    Malformed(#[from] serde_json::Error),
}
