//! Summary statistics over a flattened netlist.
//!
//! Combinational depth is computed on a petgraph `DiGraph` of the
//! combinational gates only: flip-flops and port pseudo-gates cut timing
//! paths. Combinational loops are collapsed into strongly connected
//! components so the computation always terminates; each component counts as
//! a single level.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::algo::{condensation, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::netlist::Netlist;

/// Aggregate figures reported alongside a synthesized netlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetlistStats {
    /// Number of logic gates (port pseudo-gates excluded).
    pub total_gates: usize,
    /// Logic gate count per gate type, in first-seen order.
    pub gate_breakdown: IndexMap<String, usize>,
    /// Longest chain of combinational gates between sequential/IO boundaries.
    pub max_depth: usize,
    /// Largest number of gate inputs reading a single net.
    pub max_fanout: usize,
    pub wire_count: usize,
}

/// Computes [`NetlistStats`] for a netlist.
pub fn compute_stats(netlist: &Netlist) -> NetlistStats {
    let mut gate_breakdown: IndexMap<String, usize> = IndexMap::new();
    for gate in netlist.gates.iter().filter(|g| !g.is_io()) {
        *gate_breakdown.entry(gate.gate_type.clone()).or_insert(0) += 1;
    }
    let total_gates = gate_breakdown.values().sum();

    NetlistStats {
        total_gates,
        gate_breakdown,
        max_depth: max_combinational_depth(netlist),
        max_fanout: max_fanout(netlist),
        wire_count: netlist.wires.len(),
    }
}

fn max_fanout(netlist: &Netlist) -> usize {
    let mut fanout: HashMap<&str, usize> = HashMap::new();
    for gate in &netlist.gates {
        for net in &gate.outputs {
            fanout.entry(net.as_str()).or_insert(0);
        }
    }
    for gate in &netlist.gates {
        for net in &gate.inputs {
            *fanout.entry(net.as_str()).or_insert(0) += 1;
        }
    }
    fanout.values().copied().max().unwrap_or(0)
}

fn max_combinational_depth(netlist: &Netlist) -> usize {
    let mut producers: HashMap<&str, usize> = HashMap::new();
    for (index, gate) in netlist.gates.iter().enumerate() {
        for net in &gate.outputs {
            producers.insert(net.as_str(), index);
        }
    }

    let is_combinational = |index: usize| {
        let gate = &netlist.gates[index];
        !gate.is_io() && !gate.is_flip_flop()
    };

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();
    for index in (0..netlist.gates.len()).filter(|&i| is_combinational(i)) {
        nodes.insert(index, graph.add_node(index));
    }

    for (&index, &node) in &nodes {
        for net in &netlist.gates[index].inputs {
            let Some(&driver) = producers.get(net.as_str()) else {
                continue;
            };
            if let Some(&driver_node) = nodes.get(&driver) {
                graph.add_edge(driver_node, node, ());
            }
        }
    }

    let dag = condensation(graph, true);
    let order = toposort(&dag, None).unwrap_or_default();

    let mut depth = vec![0usize; dag.node_count()];
    let mut max_depth = 0;
    for node in order {
        let level = dag
            .neighbors_directed(node, Direction::Incoming)
            .map(|pred| depth[pred.index()])
            .max()
            .unwrap_or(0)
            + 1;
        depth[node.index()] = level;
        max_depth = max_depth.max(level);
    }
    max_depth
}
