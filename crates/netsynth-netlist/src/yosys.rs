//! Serde model of the Yosys `write_json` format.
//!
//! Only the parts needed to rebuild connectivity are modelled: module ports,
//! cells, cell connections and port directions. Everything else in the
//! document (attributes, parameters, netnames) is ignored. Maps are
//! [`IndexMap`]s so module, port and cell order follows the document.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::NetlistError;

/// Top-level Yosys JSON document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YosysDesign {
    /// Tool banner, e.g. `"Yosys 0.38"`.
    #[serde(default)]
    pub creator: Option<String>,
    /// Modules keyed by module name.
    #[serde(default)]
    pub modules: IndexMap<String, YosysModule>,
}

impl YosysDesign {
    /// Parses a design from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, NetlistError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A single module of the design.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YosysModule {
    #[serde(default)]
    pub ports: IndexMap<String, YosysPort>,
    #[serde(default)]
    pub cells: IndexMap<String, YosysCell>,
}

/// A module port. Multi-bit ports list one net per bit, LSB first.
#[derive(Debug, Clone, Deserialize)]
pub struct YosysPort {
    /// `"input"`, `"output"` or `"inout"`.
    pub direction: String,
    pub bits: Vec<Bit>,
}

impl YosysPort {
    pub fn is_input(&self) -> bool {
        self.direction == "input"
    }
}

/// A cell instance (a gate or flip-flop after techmapping).
#[derive(Debug, Clone, Deserialize)]
pub struct YosysCell {
    /// Cell type such as `$_AND_` or `$_DFF_P_`.
    #[serde(rename = "type")]
    pub cell_type: String,
    #[serde(default)]
    pub port_directions: IndexMap<String, String>,
    #[serde(default)]
    pub connections: IndexMap<String, Vec<Bit>>,
}

impl YosysCell {
    /// Returns `true` if the named cell port drives its nets.
    ///
    /// Ports without a declared direction are treated as inputs.
    pub fn is_output(&self, port: &str) -> bool {
        self.port_directions
            .get(port)
            .is_some_and(|direction| direction == "output")
    }
}

/// One bit of a signal: either a net number or a constant (`"0"`, `"1"`,
/// `"x"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum Bit {
    Net(u64),
    Constant(String),
}

impl Bit {
    /// Net identifier used in the flattened netlist, e.g. `n42`.
    pub fn net_id(&self) -> String {
        format!("n{self}")
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bit::Net(n) => write!(f, "{n}"),
            Bit::Constant(c) => f.write_str(c),
        }
    }
}
