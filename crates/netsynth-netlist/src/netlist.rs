//! Flattened gate/wire view of a synthesized design.
//!
//! Every module port bit becomes an `INPUT` or `OUTPUT` pseudo-gate and every
//! cell becomes a logic gate. Wires connect the gate that drives a net to each
//! gate that reads it. All modules of the design are flattened into the same
//! gate list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::yosys::{YosysCell, YosysDesign, YosysPort};

/// Gate type of module input pseudo-gates.
pub const INPUT_GATE: &str = "INPUT";
/// Gate type of module output pseudo-gates.
pub const OUTPUT_GATE: &str = "OUTPUT";

/// Display properties attached to a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateProperties {
    pub name: String,
}

/// A gate in the flattened netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// `port_<port>_<bit>` for ports, `cell_<cell>` for cells.
    pub id: String,
    /// `INPUT`, `OUTPUT`, or the normalized cell type (`AND`, `DFF_P`, ...).
    #[serde(rename = "type")]
    pub gate_type: String,
    /// Nets read by the gate.
    pub inputs: Vec<String>,
    /// Nets driven by the gate.
    pub outputs: Vec<String>,
    pub properties: GateProperties,
}

impl Gate {
    /// Returns `true` for `INPUT`/`OUTPUT` pseudo-gates.
    pub fn is_io(&self) -> bool {
        self.gate_type == INPUT_GATE || self.gate_type == OUTPUT_GATE
    }

    /// Returns `true` for sequential elements (`DFF*` and other `*FF*` cells).
    pub fn is_flip_flop(&self) -> bool {
        self.gate_type.starts_with("DFF") || self.gate_type.contains("FF")
    }
}

/// A driver-to-reader connection over a single net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wire {
    pub from: String,
    pub from_port: String,
    pub to: String,
    pub to_port: String,
}

/// Gates and wires of a flattened design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Netlist {
    pub gates: Vec<Gate>,
    pub wires: Vec<Wire>,
}

impl Netlist {
    /// Flattens a parsed Yosys design.
    pub fn from_design(design: &YosysDesign) -> Self {
        let mut gates = Vec::new();
        // net id -> id of the gate driving it
        let mut producers: HashMap<String, String> = HashMap::new();

        for module in design.modules.values() {
            for (port_name, port) in &module.ports {
                push_port_gates(port_name, port, &mut gates, &mut producers);
            }
            for (cell_name, cell) in &module.cells {
                gates.push(cell_gate(cell_name, cell, &mut producers));
            }
        }

        let mut wires = Vec::new();
        for gate in &gates {
            for net in &gate.inputs {
                if let Some(source) = producers.get(net) {
                    wires.push(Wire {
                        from: source.clone(),
                        from_port: net.clone(),
                        to: gate.id.clone(),
                        to_port: net.clone(),
                    });
                }
            }
        }

        Netlist { gates, wires }
    }
}

fn push_port_gates(
    port_name: &str,
    port: &YosysPort,
    gates: &mut Vec<Gate>,
    producers: &mut HashMap<String, String>,
) {
    let multi_bit = port.bits.len() > 1;
    for (index, bit) in port.bits.iter().enumerate() {
        let id = format!("port_{port_name}_{index}");
        let net = bit.net_id();
        let name = if multi_bit {
            format!("{port_name}[{index}]")
        } else {
            port_name.to_string()
        };

        let gate = if port.is_input() {
            producers.insert(net.clone(), id.clone());
            Gate {
                id,
                gate_type: INPUT_GATE.to_string(),
                inputs: Vec::new(),
                outputs: vec![net],
                properties: GateProperties { name },
            }
        } else {
            Gate {
                id,
                gate_type: OUTPUT_GATE.to_string(),
                inputs: vec![net],
                outputs: Vec::new(),
                properties: GateProperties { name },
            }
        };
        gates.push(gate);
    }
}

fn cell_gate(cell_name: &str, cell: &YosysCell, producers: &mut HashMap<String, String>) -> Gate {
    let id = format!("cell_{cell_name}");
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();

    for (port, bits) in &cell.connections {
        let drives = cell.is_output(port);
        for bit in bits {
            let net = bit.net_id();
            if drives {
                producers.insert(net.clone(), id.clone());
                outputs.push(net);
            } else {
                inputs.push(net);
            }
        }
    }

    Gate {
        id,
        gate_type: normalize_cell_type(&cell.cell_type),
        inputs,
        outputs,
        properties: GateProperties {
            name: cell_name.to_string(),
        },
    }
}

/// Strips the `$`/`_` decoration Yosys puts around internal cell types.
///
/// `$_AND_` becomes `AND`, `$_DFF_P_` becomes `DFF_P`, `$mux` becomes `mux`.
pub fn normalize_cell_type(cell_type: &str) -> String {
    cell_type
        .trim_start_matches(['$', '_'])
        .trim_end_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist_from_json;

    const HALF_ADDER: &[u8] = br#"{
        "modules": {
            "half_adder": {
                "ports": {
                    "a": { "direction": "input", "bits": [2] },
                    "b": { "direction": "input", "bits": [3] },
                    "s": { "direction": "output", "bits": [4] },
                    "c": { "direction": "output", "bits": [5] }
                },
                "cells": {
                    "$xor$ha.v:4$1": {
                        "type": "$_XOR_",
                        "port_directions": { "A": "input", "B": "input", "Y": "output" },
                        "connections": { "A": [2], "B": [3], "Y": [4] }
                    },
                    "$and$ha.v:5$2": {
                        "type": "$_AND_",
                        "port_directions": { "A": "input", "B": "input", "Y": "output" },
                        "connections": { "A": [2], "B": [3], "Y": [5] }
                    }
                }
            }
        }
    }"#;

    #[test]
    fn normalizes_yosys_cell_types() {
        assert_eq!(normalize_cell_type("$_AND_"), "AND");
        assert_eq!(normalize_cell_type("$_DFF_P_"), "DFF_P");
        assert_eq!(normalize_cell_type("$mux"), "mux");
        assert_eq!(normalize_cell_type("SB_LUT4"), "SB_LUT4");
    }

    #[test]
    fn half_adder_gates_and_wires() {
        let netlist = netlist_from_json(HALF_ADDER).unwrap();

        let ids: Vec<&str> = netlist.gates.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "port_a_0",
                "port_b_0",
                "port_s_0",
                "port_c_0",
                "cell_$xor$ha.v:4$1",
                "cell_$and$ha.v:5$2",
            ]
        );

        let xor = &netlist.gates[4];
        assert_eq!(xor.gate_type, "XOR");
        assert_eq!(xor.inputs, vec!["n2", "n3"]);
        assert_eq!(xor.outputs, vec!["n4"]);
        assert_eq!(xor.properties.name, "$xor$ha.v:4$1");

        // a, b feed both cells; each cell feeds one output port
        assert_eq!(netlist.wires.len(), 6);
        assert!(netlist.wires.contains(&Wire {
            from: "cell_$and$ha.v:5$2".to_string(),
            from_port: "n5".to_string(),
            to: "port_c_0".to_string(),
            to_port: "n5".to_string(),
        }));
    }

    #[test]
    fn multi_bit_ports_are_indexed() {
        let netlist = netlist_from_json(
            br#"{ "modules": { "m": { "ports": {
                "d": { "direction": "input", "bits": [2, 3] },
                "q": { "direction": "inout", "bits": [4] }
            } } } }"#,
        )
        .unwrap();

        assert_eq!(netlist.gates[0].properties.name, "d[0]");
        assert_eq!(netlist.gates[1].id, "port_d_1");
        assert_eq!(netlist.gates[1].properties.name, "d[1]");
        assert_eq!(netlist.gates[2].gate_type, OUTPUT_GATE);
        assert_eq!(netlist.gates[2].properties.name, "q");
    }

    #[test]
    fn inputs_without_driver_produce_no_wire() {
        let netlist = netlist_from_json(
            br#"{ "modules": { "m": { "cells": {
                "u": { "type": "$_NOT_", "port_directions": { "Y": "output" },
                       "connections": { "A": ["1"], "Y": [9] } }
            } } } }"#,
        )
        .unwrap();

        assert_eq!(netlist.gates[0].inputs, vec!["n1"]);
        assert!(netlist.wires.is_empty());
    }

    #[test]
    fn wire_serializes_camel_case() {
        let wire = Wire {
            from: "a".into(),
            from_port: "n2".into(),
            to: "b".into(),
            to_port: "n2".into(),
        };
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["fromPort"], "n2");
        assert_eq!(json["toPort"], "n2");
    }
}
