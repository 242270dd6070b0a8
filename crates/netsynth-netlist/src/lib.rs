//! Gate-level netlist model for Yosys synthesis output.
//!
//! Yosys writes its synthesized design as a JSON document (`write_json`).
//! This crate parses that document ([`yosys`]), flattens every module into a
//! list of gates connected by wires ([`netlist`]) and derives summary figures
//! such as gate counts, fan-out and combinational depth ([`stats`]).

pub mod error;
pub mod netlist;
pub mod stats;
pub mod yosys;

pub use error::NetlistError;
pub use netlist::{Gate, GateProperties, Netlist, Wire};
pub use stats::{compute_stats, NetlistStats};
pub use yosys::{Bit, YosysCell, YosysDesign, YosysModule, YosysPort};

/// Parses raw `write_json` output and transforms it into a [`Netlist`].
pub fn netlist_from_json(bytes: &[u8]) -> Result<Netlist, NetlistError> {
    let design = YosysDesign::from_slice(bytes)?;
    Ok(Netlist::from_design(&design))
}
