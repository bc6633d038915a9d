//! Graph optimization: capability propagation, dead-edge and dead-unit
//! pruning, and dead-input detection.
//!
//! Runs once, after the graph has been built and confirmed acyclic, and
//! before the per-capability structural checks in [`crate::loader::checks`].

use std::collections::HashSet;

use tracing::warn;

use crate::common::error::LoaderError;
use crate::loader::graph::RawGraph;
use crate::units::Capability;

/// Restricts every non-input unit's capabilities to what its predecessors
/// can actually feed it, drops now-incompatible edges, removes units left
/// with no capabilities, and fails if an originally-defined input port
/// has thereby lost every path to an output.
///
/// # Errors
///
/// Returns [`LoaderError::DeadInput`] if an original input port becomes a
/// dead end.
pub fn optimize(graph: &mut RawGraph) -> Result<(), LoaderError> {
    let orig_in_ports: HashSet<usize> = graph.live_nodes().filter(|&i| graph.in_degree(i) == 0).collect();
    let orig_out_ports: HashSet<usize> = graph.live_nodes().filter(|&i| graph.out_degree(i) == 0).collect();

    clean_struct(graph)?;
    rm_empty_units(graph);
    chk_terminals(graph, &orig_in_ports, &orig_out_ports)
}

/// Walks units in topological order; for each non-input unit, restricts
/// its capability set to the union, over its predecessors, of its own
/// (pre-restriction) capabilities intersected with that predecessor's
/// capabilities, dropping any in-edge whose intersection is empty.
fn clean_struct(graph: &mut RawGraph) -> Result<(), LoaderError> {
    let order = graph.topological_order()?;
    for node in order {
        if graph.in_degree(node) == 0 {
            continue;
        }
        let original_caps = graph.capabilities[node].clone();
        let preds = graph.predecessors[node].clone();

        let mut new_caps: HashSet<Capability> = HashSet::new();
        let mut dead_edges = Vec::new();
        for pred in preds {
            let common: HashSet<Capability> = original_caps
                .intersection(&graph.capabilities[pred])
                .cloned()
                .collect();
            if common.is_empty() {
                warn!(
                    from = %graph.names[pred],
                    to = %graph.names[node],
                    "units share no capabilities, dropping connecting edge"
                );
                dead_edges.push(pred);
            } else {
                new_caps.extend(common);
            }
        }
        for pred in dead_edges {
            graph.remove_edge(pred, node);
        }
        graph.capabilities[node] = new_caps;
    }
    Ok(())
}

/// Removes every unit left with an empty capability set.
fn rm_empty_units(graph: &mut RawGraph) {
    let empties: Vec<usize> = graph
        .live_nodes()
        .filter(|&i| graph.capabilities[i].is_empty())
        .collect();
    for node in empties {
        warn!(unit = %graph.names[node], "unit has no remaining capabilities, removing");
        graph.remove_node(node);
    }
}

/// Finds units that now have no successors but did not originally, i.e.
/// dead ends created by the trimming above. An original input port that
/// becomes one is a fatal [`LoaderError::DeadInput`]; any other unit is
/// simply removed with a warning.
fn chk_terminals(
    graph: &mut RawGraph,
    orig_in_ports: &HashSet<usize>,
    orig_out_ports: &HashSet<usize>,
) -> Result<(), LoaderError> {
    let new_dead_ends: Vec<usize> = graph
        .live_nodes()
        .filter(|i| graph.out_degree(*i) == 0 && !orig_out_ports.contains(i))
        .collect();

    for node in new_dead_ends {
        if orig_in_ports.contains(&node) {
            return Err(LoaderError::DeadInput {
                port: graph.names[node].clone(),
            });
        }
        warn!(unit = %graph.names[node], "dead end detected after optimization, removing");
        graph.remove_node(node);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::optimize;
    use crate::common::error::LoaderError;
    use crate::loader::graph::build_graph;
    use crate::loader::raw::{RawCapability, RawProcessorDesc, RawUnit};

    fn unit(name: &str, caps: &[&str]) -> RawUnit {
        RawUnit {
            name: name.to_string(),
            width: 1,
            capabilities: caps
                .iter()
                .map(|c| RawCapability::Bare((*c).to_string()))
                .collect(),
            read_lock: false,
            write_lock: false,
            memory_access: Vec::new(),
        }
    }

    #[test]
    fn propagates_capability_intersection_downstream() {
        let raw = RawProcessorDesc {
            units: vec![
                unit("input", &["ALU", "MEM"]),
                unit("output", &["ALU"]),
            ],
            data_path: vec![vec!["input".to_string(), "output".to_string()]],
        };
        let mut graph = build_graph(&raw).unwrap();
        optimize(&mut graph).unwrap();
        let output_idx = graph
            .live_nodes()
            .find(|&i| graph.names[i].as_str() == "output")
            .unwrap();
        assert_eq!(graph.capabilities[output_idx].len(), 1);
    }

    #[test]
    fn incompatible_edge_is_dropped_and_dead_input_detected() {
        let raw = RawProcessorDesc {
            units: vec![unit("input", &["ALU"]), unit("output", &["MEM"])],
            data_path: vec![vec!["input".to_string(), "output".to_string()]],
        };
        let mut graph = build_graph(&raw).unwrap();
        assert!(matches!(
            optimize(&mut graph),
            Err(LoaderError::DeadInput { .. })
        ));
    }

    #[test]
    fn chain_of_incompatible_edges_strands_the_input_port() {
        let raw = RawProcessorDesc {
            units: vec![
                unit("input", &["ALU"]),
                unit("middle", &["MEM"]),
                unit("output", &["ALU"]),
            ],
            data_path: vec![
                vec!["input".to_string(), "middle".to_string()],
                vec!["middle".to_string(), "output".to_string()],
            ],
        };
        let mut graph = build_graph(&raw).unwrap();
        // `middle` shares no capability with `input`, so its sole in-edge
        // is dropped and it is pruned as empty; `output` then loses its
        // only predecessor and is pruned the same way, leaving `input`
        // with no successors at all — a dead input, since it was an
        // original input port.
        assert!(matches!(
            optimize(&mut graph),
            Err(LoaderError::DeadInput { .. })
        ));
    }

    #[test]
    fn non_input_dead_end_is_silently_pruned() {
        let raw = RawProcessorDesc {
            units: vec![
                unit("input", &["ALU"]),
                unit("branch", &["ALU"]),
                unit("dead", &["MEM"]),
                unit("output", &["ALU"]),
            ],
            data_path: vec![
                vec!["input".to_string(), "branch".to_string()],
                vec!["branch".to_string(), "dead".to_string()],
                vec!["branch".to_string(), "output".to_string()],
            ],
        };
        let mut graph = build_graph(&raw).unwrap();
        // `dead` shares no capability with `branch`, so it is pruned as a
        // dead end, but `branch` still reaches `output` directly, so
        // `input` keeps a live path and no error is raised.
        optimize(&mut graph).unwrap();
        assert!(graph
            .live_nodes()
            .all(|i| graph.names[i].as_str() != "dead"));
    }
}
