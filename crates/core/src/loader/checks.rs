//! Per-capability structural checks: path-lock consistency and
//! flow-reachability from every supporting input port to some output.
//!
//! Both checks run once per capability offered by at least one input
//! port, over the graph as it stands after [`crate::loader::optimize`].

use std::collections::HashMap;

use crate::common::error::{LockKind, LoaderError};
use crate::loader::graph::RawGraph;
use crate::loader::maxflow::{FlowNetwork, UNCAPACITATED};
use crate::units::Capability;

/// A path's accumulated read- and write-lock counts, as computed walking
/// from sinks towards a given unit.
#[derive(Debug, Clone, Copy, Default)]
struct PathLocks {
    read: u64,
    write: u64,
}

/// Runs both per-capability checks over every capability offered by at
/// least one input port.
///
/// # Errors
///
/// Returns [`LoaderError::PathLock`] if some capability's paths carry
/// more than one lock of a kind, disagree between sibling paths, or fail
/// to carry exactly one lock of each kind from an input port; returns
/// [`LoaderError::BlockedCap`] if some capability cannot flow with
/// nonzero width from an input port to any output.
pub fn check_capabilities(graph: &RawGraph) -> Result<(), LoaderError> {
    let in_ports: Vec<usize> = graph.live_nodes().filter(|&i| graph.in_degree(i) == 0).collect();
    let out_ports: Vec<usize> = graph.live_nodes().filter(|&i| graph.out_degree(i) == 0).collect();
    let multi_unit = graph.live_nodes().count() > 1;

    let mut capabilities: Vec<Capability> = Vec::new();
    for &port in &in_ports {
        for cap in &graph.capabilities[port] {
            if !capabilities.contains(cap) {
                capabilities.push(cap.clone());
            }
        }
    }
    capabilities.sort();

    for cap in &capabilities {
        let supporting_in_ports: Vec<usize> = in_ports
            .iter()
            .copied()
            .filter(|&p| graph.capabilities[p].contains(cap))
            .collect();

        check_path_locks(graph, cap, &supporting_in_ports)?;
        if multi_unit {
            check_capability_flow(graph, cap, &supporting_in_ports, &out_ports)?;
        }
    }
    Ok(())
}

/// Checks that every path carrying `cap`, restricted to units both ends
/// of which support it, carries exactly one read lock and one write lock
/// by the time it reaches an input port, and that sibling paths merging
/// at a branch agree on their lock counts.
fn check_path_locks(
    graph: &RawGraph,
    cap: &Capability,
    in_ports: &[usize],
) -> Result<(), LoaderError> {
    let supports_cap: Vec<usize> = graph
        .live_nodes()
        .filter(|&i| graph.capabilities[i].contains(cap))
        .collect();

    // A full-graph reverse topological order (sinks first) also respects
    // the edges of the capability-restricted subgraph, since that
    // subgraph's edges are a subset of the full graph's: whenever one of
    // its successors must be visited before it, that still holds here.
    let mut order = graph.topological_order()?;
    order.reverse();

    let mut path_locks: HashMap<usize, PathLocks> = HashMap::new();
    for node in order.into_iter().filter(|n| supports_cap.contains(n)) {
        let successors: Vec<usize> = graph.successors[node]
            .iter()
            .copied()
            .filter(|s| supports_cap.contains(s))
            .collect();

        let read = accumulate_lock(
            graph.lock_info[node].rd_lock,
            &successors,
            &path_locks,
            |locks| locks.read,
            LockKind::Read,
            &graph.names[node],
            cap,
        )?;
        let write = accumulate_lock(
            graph.lock_info[node].wr_lock,
            &successors,
            &path_locks,
            |locks| locks.write,
            LockKind::Write,
            &graph.names[node],
            cap,
        )?;
        let _ = path_locks.insert(node, PathLocks { read, write });
    }

    for &port in in_ports {
        let locks = path_locks.get(&port).copied().unwrap_or_default();
        if locks.read != 1 {
            return Err(LoaderError::PathLock {
                start: graph.names[port].clone(),
                lock_type: LockKind::Read,
                capability: cap.clone(),
            });
        }
        if locks.write != 1 {
            return Err(LoaderError::PathLock {
                start: graph.names[port].clone(),
                lock_type: LockKind::Write,
                capability: cap.clone(),
            });
        }
    }
    Ok(())
}

/// Folds one unit's own lock bit together with the (must-agree) lock
/// count carried by its capability-restricted successors.
#[allow(clippy::too_many_arguments)]
fn accumulate_lock(
    own_lock: bool,
    successors: &[usize],
    path_locks: &HashMap<usize, PathLocks>,
    select: impl Fn(PathLocks) -> u64,
    lock_type: LockKind,
    unit: &crate::common::ident::ICaseString,
    capability: &Capability,
) -> Result<u64, LoaderError> {
    let mut tail: Option<u64> = None;
    for &succ in successors {
        let value = select(path_locks.get(&succ).copied().unwrap_or_default());
        match tail {
            None => tail = Some(value),
            Some(existing) if existing == value => {}
            Some(_) => {
                return Err(LoaderError::PathLock {
                    start: unit.clone(),
                    lock_type,
                    capability: capability.clone(),
                })
            }
        }
    }
    let total = u64::from(own_lock) + tail.unwrap_or(0);
    if total > 1 {
        return Err(LoaderError::PathLock {
            start: unit.clone(),
            lock_type,
            capability: capability.clone(),
        });
    }
    Ok(total)
}

/// Builds a vertex-capacitated flow network over the units sharing
/// `cap`, with every output port welded to a single sink, and checks
/// that each supporting input port can reach it with nonzero flow.
fn check_capability_flow(
    graph: &RawGraph,
    cap: &Capability,
    in_ports: &[usize],
    out_ports: &[usize],
) -> Result<(), LoaderError> {
    let nodes: Vec<usize> = graph
        .live_nodes()
        .filter(|&i| graph.capabilities[i].contains(cap))
        .collect();
    let index_of: HashMap<usize, usize> =
        nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    // Node `i` splits into in-twin `2*i` and out-twin `2*i + 1`, joined by
    // a capping edge carrying the unit's own width; all other edges are
    // left uncapacitated, since each endpoint's own width constraint is
    // already enforced by its capping edge.
    let sink = 2 * nodes.len();
    let mut base_network = FlowNetwork::new(sink + 1);
    for (i, &node) in nodes.iter().enumerate() {
        base_network.add_edge(2 * i, 2 * i + 1, graph.widths[node]);
    }
    for (i, &node) in nodes.iter().enumerate() {
        for &succ in &graph.successors[node] {
            if let Some(&j) = index_of.get(&succ) {
                base_network.add_edge(2 * i + 1, 2 * j, UNCAPACITATED);
            }
        }
    }
    for &port in out_ports {
        if let Some(&j) = index_of.get(&port) {
            base_network.add_edge(2 * j + 1, sink, UNCAPACITATED);
        }
    }

    for &port in in_ports {
        let Some(&source) = index_of.get(&port) else {
            continue;
        };
        let mut network = base_network.clone();
        if network.max_flow(2 * source, sink) == 0 {
            return Err(LoaderError::BlockedCap {
                capability: cap.clone(),
                port: graph.names[port].clone(),
            });
        }
    }
    Ok(())
}
