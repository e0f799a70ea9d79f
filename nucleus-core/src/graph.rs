//! Generic directed graph with topological sort and cycle detection.
//!
//! Used both for the module dependency graph (`String` nodes, see
//! [`crate::importer`]) and anywhere else a topological order over named
//! items is needed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::error::NucleusError;

/// Directed graph over nodes of type `N`. Preserves insertion order for
/// both nodes and each node's out-edges, which determines tie-breaking in
/// `topological_sort`.
#[derive(Debug, Clone)]
pub struct DependencyGraph<N: Clone + Eq + Hash> {
    nodes: Vec<N>,
    index: HashMap<N, usize>,
    out_edges: Vec<Vec<usize>>,
}

impl<N: Clone + Eq + Hash + std::fmt::Debug> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone + Eq + Hash + std::fmt::Debug> DependencyGraph<N> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            out_edges: Vec::new(),
        }
    }

    /// Idempotent insertion; returns the node's stable index.
    pub fn add_node(&mut self, n: N) -> usize {
        if let Some(&idx) = self.index.get(&n) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(n.clone(), idx);
        self.nodes.push(n);
        self.out_edges.push(Vec::new());
        idx
    }

    /// Inserts `from` and `to` if missing, then appends `to` to `from`'s
    /// out-list. Duplicate edges are permitted in the out-list (iteration
    /// order is preserved) but are coalesced when computing in-degree.
    pub fn add_edge(&mut self, from: N, to: N) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        self.out_edges[from_idx].push(to_idx);
    }

    pub fn contains(&self, n: &N) -> bool {
        self.index.contains_key(n)
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Returns nodes in an order where every edge `a -> b` has `a` preceding
    /// `b`. Ties among ready nodes are broken by insertion order. Fails with
    /// `CircularDependency` carrying one concrete cycle on failure.
    pub fn topological_sort(&self) -> Result<Vec<N>, NucleusError> {
        let n = self.nodes.len();

        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (from, outs) in self.out_edges.iter().enumerate() {
            let mut seen: HashSet<usize> = HashSet::new();
            for &to in outs {
                if seen.insert(to) {
                    in_degree[to] += 1;
                    dependents[from].push(to);
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &dep in &dependents[idx] {
                in_degree[dep] -= 1;
                if in_degree[dep] == 0 {
                    queue.push_back(dep);
                }
            }
        }

        if order.len() < n {
            let cycle = self.extract_cycle(&in_degree);
            return Err(NucleusError::CircularDependency { cycle });
        }

        Ok(order.into_iter().map(|idx| self.nodes[idx].clone()).collect())
    }

    /// DFS over nodes still holding positive in-degree (i.e. part of some
    /// cycle, or blocked downstream of one) to produce a concrete cycle for
    /// the error payload.
    fn extract_cycle(&self, in_degree: &[usize]) -> Vec<N> {
        let remaining: HashSet<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .collect();

        // A node blocked only downstream of a cycle (never itself revisited
        // by the DFS below) may have no out-edge back into `remaining`, so
        // the start node must be one that does have one — true of any node
        // actually sitting on the cycle.
        let start = *remaining
            .iter()
            .filter(|&&i| self.out_edges[i].iter().any(|to| remaining.contains(to)))
            .min()
            .expect("a cycle must contain a node with an edge into the remaining set");
        let mut path = vec![start];
        let mut on_path: HashMap<usize, usize> = HashMap::new();
        on_path.insert(start, 0);
        let mut current = start;

        loop {
            let next = self.out_edges[current]
                .iter()
                .find(|&&to| remaining.contains(&to))
                .copied()
                .expect("node with positive in-degree must have an edge into the cycle");

            if let Some(&pos) = on_path.get(&next) {
                path.push(next);
                return path[pos..].iter().map(|&idx| self.nodes[idx].clone()).collect();
            }

            on_path.insert(next, path.len());
            path.push(next);
            current = next;
        }
    }

    /// New graph with every edge flipped, same node set and insertion order.
    pub fn reversed(&self) -> Self {
        let mut reversed_edges = vec![Vec::new(); self.nodes.len()];
        for (from, outs) in self.out_edges.iter().enumerate() {
            for &to in outs {
                reversed_edges[to].push(from);
            }
        }
        Self {
            nodes: self.nodes.clone(),
            index: self.index.clone(),
            out_edges: reversed_edges,
        }
    }
}
