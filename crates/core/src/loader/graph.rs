//! Arena-based construction of the unit graph from a raw description.
//!
//! Internally the loader works over plain indices into parallel vectors
//! rather than a pointer-linked structure: `UnitModel`s live in a single
//! arena, and edges are index pairs in companion adjacency lists. This
//! sidesteps reference-cycle bookkeeping during the build and lets the
//! later optimization and checking passes (see
//! [`crate::loader::optimize`] and [`crate::loader::checks`]) share one
//! simple representation. `Rc`-based identity (see [`crate::units`]) is
//! introduced only once the graph is fully validated.

use std::collections::HashSet;

use tracing::warn;

use crate::common::error::{ElemKind, LoaderError};
use crate::common::ident::ICaseString;
use crate::common::indexed_set::IndexedSet;
use crate::loader::raw::RawProcessorDesc;
use crate::units::{Capability, LockInfo};

/// The unit graph in arena form: node `i`'s fields live at index `i` of
/// each parallel vector.
#[derive(Debug, Default)]
pub struct RawGraph {
    /// Canonical (first-spelling) names, indexed by node.
    pub names: Vec<ICaseString>,
    /// Declared widths, indexed by node.
    pub widths: Vec<u64>,
    /// Capability sets, indexed by node. Mutated in place by
    /// [`crate::loader::optimize`].
    pub capabilities: Vec<HashSet<Capability>>,
    /// Lock attributes, indexed by node.
    pub lock_info: Vec<LockInfo>,
    /// Memory-ACL sets, indexed by node.
    pub mem_acl: Vec<HashSet<Capability>>,
    /// Outgoing edges, indexed by node.
    pub successors: Vec<Vec<usize>>,
    /// Incoming edges, indexed by node.
    pub predecessors: Vec<Vec<usize>>,
    /// Tombstones for nodes removed by optimization; arena indices are
    /// never reused or compacted, so predecessor/successor references
    /// stay valid even after a node is logically deleted.
    pub removed: Vec<bool>,
}

impl RawGraph {
    /// Number of arena slots, including any tombstoned nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if node `idx` has been removed by optimization.
    #[must_use]
    pub fn is_removed(&self, idx: usize) -> bool {
        self.removed[idx]
    }

    /// Iterates the indices of nodes that have not been removed.
    pub fn live_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.node_count()).filter(|&i| !self.removed[i])
    }

    /// In-degree of node `idx`.
    #[must_use]
    pub fn in_degree(&self, idx: usize) -> usize {
        self.predecessors[idx].len()
    }

    /// Out-degree of node `idx`.
    #[must_use]
    pub fn out_degree(&self, idx: usize) -> usize {
        self.successors[idx].len()
    }

    /// Removes the edge `from -> to`, if present, from both adjacency
    /// lists.
    pub fn remove_edge(&mut self, from: usize, to: usize) {
        self.successors[from].retain(|&n| n != to);
        self.predecessors[to].retain(|&n| n != from);
    }

    /// Removes node `idx` and every edge touching it.
    pub fn remove_node(&mut self, idx: usize) {
        for pred in std::mem::take(&mut self.predecessors[idx]) {
            self.successors[pred].retain(|&n| n != idx);
        }
        for succ in std::mem::take(&mut self.successors[idx]) {
            self.predecessors[succ].retain(|&n| n != idx);
        }
        self.removed[idx] = true;
    }

    /// Returns a deterministic topological order over live nodes (sources
    /// first), breaking ties between simultaneously-ready nodes by
    /// canonical name.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NotDAG`] if the live subgraph contains a
    /// cycle (the returned order would otherwise omit the nodes on that
    /// cycle).
    pub fn topological_order(&self) -> Result<Vec<usize>, LoaderError> {
        let live_count = self.live_nodes().count();
        let mut in_degree: Vec<usize> = (0..self.node_count()).map(|i| self.in_degree(i)).collect();
        let mut ready: Vec<usize> = self.live_nodes().filter(|&i| in_degree[i] == 0).collect();

        let mut order = Vec::with_capacity(live_count);
        while !ready.is_empty() {
            ready.sort_by(|&a, &b| self.names[a].cmp(&self.names[b]));
            let node = ready.remove(0);
            order.push(node);
            for &succ in &self.successors[node] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(succ);
                }
            }
        }

        if order.len() != live_count {
            return Err(LoaderError::NotDAG);
        }
        Ok(order)
    }
}

struct UnitBuild {
    capability_names: Vec<String>,
    mem_access_names: Vec<String>,
    read_lock: bool,
    write_lock: bool,
}

/// Builds a [`RawGraph`] from a [`RawProcessorDesc`], performing steps
/// 1–6 of the loader: name/capability/memory-ACL registration, edge
/// resolution, and an acyclicity check. Optimization (step 7) and the
/// per-capability structural checks (step 8) are separate passes.
///
/// # Errors
///
/// Returns [`LoaderError::BadWidth`], [`LoaderError::DupElem`],
/// [`LoaderError::UndefElem`], [`LoaderError::BadEdge`], or
/// [`LoaderError::NotDAG`] as appropriate.
pub fn build_graph(raw: &RawProcessorDesc) -> Result<RawGraph, LoaderError> {
    let mut graph = RawGraph::default();
    let mut name_index: IndexedSet<String, usize> = IndexedSet::new();
    let mut global_caps: HashSet<Capability> = HashSet::new();

    for unit in &raw.units {
        if unit.width < 1 {
            return Err(LoaderError::BadWidth {
                unit: ICaseString::from(unit.name.as_str()),
                width: unit.width,
            });
        }
        let canonical_name = ICaseString::from(unit.name.as_str());
        let folded = unit.name.to_lowercase();
        if let Some(&existing_idx) = name_index.get(folded.as_str()) {
            return Err(LoaderError::DupElem {
                old_elem: graph.names[existing_idx].clone(),
                new_elem: canonical_name,
            });
        }

        let built = register_unit_capabilities(unit, &mut global_caps);
        let idx = graph.node_count();
        let _ = name_index.add(folded, idx);
        graph.names.push(canonical_name);
        #[allow(clippy::cast_sign_loss)]
        graph.widths.push(unit.width as u64);
        graph.lock_info.push(LockInfo {
            rd_lock: built.read_lock,
            wr_lock: built.write_lock,
        });

        let own_caps: HashSet<Capability> = built
            .capability_names
            .iter()
            .map(|n| canonicalize(n, &global_caps))
            .collect();

        let mut mem_acl = HashSet::new();
        for name in &built.mem_access_names {
            let id = ICaseString::from(name.as_str());
            let Some(canonical) = global_caps.get(&id) else {
                return Err(LoaderError::UndefElem {
                    kind: ElemKind::Capability,
                    name: id,
                });
            };
            if !own_caps.contains(canonical) {
                return Err(LoaderError::UndefElem {
                    kind: ElemKind::Capability,
                    name: canonical.clone(),
                });
            }
            if canonical.as_str() != id.as_str() {
                warn!(capability = %canonical, spelling = %id, "non-standard-case memory access spelling normalized");
            }
            let _ = mem_acl.insert(canonical.clone());
        }

        graph.capabilities.push(own_caps);
        graph.mem_acl.push(mem_acl);
        graph.successors.push(Vec::new());
        graph.predecessors.push(Vec::new());
        graph.removed.push(false);
    }

    register_edges(&mut graph, &name_index, &raw.data_path)?;
    graph.topological_order()?;
    Ok(graph)
}

fn canonicalize(name: &str, global_caps: &HashSet<Capability>) -> Capability {
    let id = ICaseString::from(name);
    global_caps.get(&id).cloned().unwrap_or(id)
}

fn register_unit_capabilities(
    unit: &crate::loader::raw::RawUnit,
    global_caps: &mut HashSet<Capability>,
) -> UnitBuild {
    let (raw_names, mem_access_names) = unit.normalized_capabilities();
    let mut seen_locally: HashSet<Capability> = HashSet::new();
    let mut capability_names = Vec::with_capacity(raw_names.len());

    for name in raw_names {
        let id = ICaseString::from(name.as_str());
        let canonical = if let Some(existing) = global_caps.get(&id) {
            if existing.as_str() != id.as_str() {
                warn!(capability = %existing, spelling = %id, "case-variant capability spelling normalized");
            }
            existing.clone()
        } else {
            let _ = global_caps.insert(id.clone());
            id
        };

        if seen_locally.contains(&canonical) {
            warn!(unit = %unit.name, capability = %canonical, "duplicate capability on unit dropped");
            continue;
        }
        let _ = seen_locally.insert(canonical.clone());
        capability_names.push(canonical.as_str().to_string());
    }

    UnitBuild {
        capability_names,
        mem_access_names,
        read_lock: unit.read_lock,
        write_lock: unit.write_lock,
    }
}

fn register_edges(
    graph: &mut RawGraph,
    name_index: &IndexedSet<String, usize>,
    data_path: &[Vec<String>],
) -> Result<(), LoaderError> {
    let mut seen_edges: HashSet<(usize, usize)> = HashSet::new();
    for edge in data_path {
        if edge.len() != 2 {
            return Err(LoaderError::BadEdge { edge: edge.clone() });
        }
        let from = resolve_unit(name_index, &edge[0])?;
        let to = resolve_unit(name_index, &edge[1])?;
        if !seen_edges.insert((from, to)) {
            warn!(from = %graph.names[from], to = %graph.names[to], "duplicate edge dropped");
            continue;
        }
        graph.successors[from].push(to);
        graph.predecessors[to].push(from);
    }
    Ok(())
}

fn resolve_unit(name_index: &IndexedSet<String, usize>, name: &str) -> Result<usize, LoaderError> {
    name_index
        .get(name.to_lowercase().as_str())
        .copied()
        .ok_or_else(|| LoaderError::UndefElem {
            kind: ElemKind::Unit,
            name: ICaseString::from(name),
        })
}
