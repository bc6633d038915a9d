//! A small vertex-capacitated max-flow solver (Edmonds-Karp over a graph
//! where every node has already been split into an in-twin/out-twin pair
//! joined by a capacity edge), used by [`crate::loader::checks`] to
//! verify that a capability can reach some output from a given input
//! port with nonzero width.

use std::collections::VecDeque;

/// A directed flow network with integer edge capacities, built once and
/// solved once.
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    adjacency: Vec<Vec<usize>>,
    edge_to: Vec<usize>,
    edge_capacity: Vec<u64>,
}

/// A capacity large enough to behave as "uncapacitated" relative to any
/// realistic unit width, while still leaving headroom to sum without
/// overflow.
pub const UNCAPACITATED: u64 = u64::MAX / 4;

impl FlowNetwork {
    /// Creates an empty network over `node_count` nodes.
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
            edge_to: Vec::new(),
            edge_capacity: Vec::new(),
        }
    }

    /// Adds a directed edge `from -> to` with the given capacity, plus its
    /// zero-capacity residual twin.
    pub fn add_edge(&mut self, from: usize, to: usize, capacity: u64) {
        let forward = self.edge_to.len();
        self.edge_to.push(to);
        self.edge_capacity.push(capacity);
        self.adjacency[from].push(forward);

        let backward = self.edge_to.len();
        self.edge_to.push(from);
        self.edge_capacity.push(0);
        self.adjacency[to].push(backward);
    }

    /// Computes the maximum flow from `source` to `sink` via repeated
    /// breadth-first augmenting paths.
    #[must_use]
    pub fn max_flow(&mut self, source: usize, sink: usize) -> u64 {
        let mut total = 0u64;
        loop {
            let Some((bottleneck, path)) = self.find_augmenting_path(source, sink) else {
                break;
            };
            for edge in path {
                self.edge_capacity[edge] -= bottleneck;
                self.edge_capacity[edge ^ 1] += bottleneck;
            }
            total += bottleneck;
        }
        total
    }

    /// Finds one shortest (by edge count) augmenting path from `source` to
    /// `sink`, returning its bottleneck capacity and the list of edges
    /// along it, or `None` if `sink` is unreachable.
    fn find_augmenting_path(&self, source: usize, sink: usize) -> Option<(u64, Vec<usize>)> {
        let mut parent_edge: Vec<Option<usize>> = vec![None; self.adjacency.len()];
        let mut visited = vec![false; self.adjacency.len()];
        visited[source] = true;
        let mut queue = VecDeque::from([source]);

        while let Some(node) = queue.pop_front() {
            for &edge in &self.adjacency[node] {
                let next = self.edge_to[edge];
                if !visited[next] && self.edge_capacity[edge] > 0 {
                    visited[next] = true;
                    parent_edge[next] = Some(edge);
                    queue.push_back(next);
                }
            }
        }

        if !visited[sink] {
            return None;
        }

        let mut bottleneck = u64::MAX;
        let mut path = Vec::new();
        let mut node = sink;
        while let Some(edge) = parent_edge[node] {
            bottleneck = bottleneck.min(self.edge_capacity[edge]);
            path.push(edge);
            node = self.edge_to[edge ^ 1];
        }
        Some((bottleneck, path))
    }
}
