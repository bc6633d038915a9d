//! Processor description loading: parses a format-neutral raw
//! description into a validated [`ProcessorDesc`], ready for simulation.
//!
//! The pipeline is: [`graph::build_graph`] (structural registration and
//! acyclicity) → [`optimize::optimize`] (capability propagation and
//! dead-end pruning) → [`checks::check_capabilities`] (per-capability
//! path-lock and flow checks) → partitioning into the final port
//! categories with `Rc`-based identity semantics.

pub mod checks;
pub mod graph;
pub mod maxflow;
pub mod optimize;
pub mod raw;

use std::collections::HashMap;
use std::rc::Rc;

use crate::common::error::LoaderError;
use crate::loader::graph::RawGraph;
use crate::units::{FuncUnit, UnitModel};

pub use raw::{RawCapability, RawProcessorDesc, RawUnit};

/// A fully validated processor, partitioned by port role.
#[derive(Debug, Clone, Default)]
pub struct ProcessorDesc {
    /// Units with in-degree 0 and out-degree > 0.
    pub in_ports: Vec<Rc<UnitModel>>,
    /// Units with in-degree > 0 and out-degree 0, with their predecessors.
    pub out_ports: Vec<FuncUnit>,
    /// Standalone units with both degrees 0.
    pub in_out_ports: Vec<Rc<UnitModel>>,
    /// Units with both degrees > 0, in reverse topological order (every
    /// unit appears before its predecessors).
    pub internal_units: Vec<FuncUnit>,
}

/// Loads and validates a processor description.
///
/// # Errors
///
/// Returns any [`LoaderError`] raised while building the graph,
/// optimizing it, or running the per-capability checks, or
/// [`LoaderError::EmptyProc`] if no input ports remain.
pub fn load_processor(raw: &RawProcessorDesc) -> Result<ProcessorDesc, LoaderError> {
    let mut graph = graph::build_graph(raw)?;
    optimize::optimize(&mut graph)?;
    checks::check_capabilities(&graph)?;
    partition(&graph)
}

fn partition(graph: &RawGraph) -> Result<ProcessorDesc, LoaderError> {
    if graph.live_nodes().filter(|&i| graph.in_degree(i) == 0).count() == 0 {
        return Err(LoaderError::EmptyProc);
    }

    let models: HashMap<usize, Rc<UnitModel>> = graph
        .live_nodes()
        .map(|i| (i, Rc::new(unit_model(graph, i))))
        .collect();

    let mut desc = ProcessorDesc::default();
    let reverse_order: Vec<usize> = {
        let mut order = graph.topological_order()?;
        order.reverse();
        order
    };

    for node in reverse_order {
        let in_deg = graph.in_degree(node);
        let out_deg = graph.out_degree(node);
        let model = Rc::clone(&models[&node]);

        match (in_deg == 0, out_deg == 0) {
            (true, true) => desc.in_out_ports.push(model),
            (true, false) => desc.in_ports.push(model),
            (false, true) => desc.out_ports.push(func_unit(graph, node, model, &models)),
            (false, false) => desc
                .internal_units
                .push(func_unit(graph, node, model, &models)),
        }
    }
    Ok(desc)
}

fn unit_model(graph: &RawGraph, idx: usize) -> UnitModel {
    UnitModel {
        name: graph.names[idx].clone(),
        width: graph.widths[idx],
        capabilities: graph.capabilities[idx].clone(),
        lock_info: graph.lock_info[idx],
        mem_acl: graph.mem_acl[idx].clone(),
    }
}

fn func_unit(
    graph: &RawGraph,
    idx: usize,
    model: Rc<UnitModel>,
    models: &HashMap<usize, Rc<UnitModel>>,
) -> FuncUnit {
    let mut predecessors: Vec<Rc<UnitModel>> = graph.predecessors[idx]
        .iter()
        .map(|p| Rc::clone(&models[p]))
        .collect();
    predecessors.sort_by(|a, b| a.name.cmp(&b.name));
    FuncUnit { model, predecessors }
}
