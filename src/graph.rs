//! Graph contract consumed by the selection engine, plus a CSR implementation.
//!
//! Edges are addressed by a dense id `0..num_edges()` so that an [`EdgeMask`]
//! can mark each one live or blocked. Reachability comes in two flavors:
//! [`InfluenceGraph::reach_from_seeds`] builds the full frontier of a seed set,
//! and [`InfluenceGraph::extend_reach`] counts what one extra vertex adds on
//! top of a cached frontier without modifying it.

use std::collections::VecDeque;
use std::ops::Range;

use crate::bitrow::{BitRow, EdgeMask, ReachSet};

/// Read-only adjacency structure with edge ids.
///
/// Implementors must be safe to traverse from many threads at once.
pub trait InfluenceGraph: Sync {
    fn num_vertices(&self) -> usize;

    fn num_edges(&self) -> usize;

    /// Ids of the edges leaving `v`.
    fn out_edges(&self, v: usize) -> Range<usize>;

    /// Head vertex of edge `e`.
    fn edge_target(&self, e: usize) -> usize;

    /// Weight of edge `e`; `1.0` for unweighted graphs.
    fn edge_weight(&self, _e: usize) -> f32 {
        1.0
    }

    /// Vertices reachable from `seeds` using only edges live in `mask`.
    fn reach_from_seeds(&self, mask: &EdgeMask, seeds: &[usize]) -> ReachSet {
        let mut reached = BitRow::with_size(self.num_vertices());
        let mut queue = VecDeque::with_capacity(seeds.len());
        for &s in seeds {
            if reached.insert(s) {
                queue.push_back(s);
            }
        }
        while let Some(u) = queue.pop_front() {
            for e in self.out_edges(u) {
                if !mask.get(e) {
                    continue;
                }
                let t = self.edge_target(e);
                if reached.insert(t) {
                    queue.push_back(t);
                }
            }
        }
        reached
    }

    /// Size of `base ∪ reach(v)` under `mask`, where `base_count = |base|`.
    ///
    /// `base` is treated as already visited and is left untouched; `scratch`
    /// is returned clean.
    fn extend_reach(
        &self,
        mask: &EdgeMask,
        v: usize,
        base: &ReachSet,
        base_count: usize,
        scratch: &mut TraversalScratch,
    ) -> usize {
        if base.get(v) {
            return base_count;
        }
        scratch.ensure(self.num_vertices());
        let mut count = base_count + 1;
        scratch.visit(v);
        scratch.queue.push_back(v);
        while let Some(u) = scratch.queue.pop_front() {
            for e in self.out_edges(u) {
                if !mask.get(e) {
                    continue;
                }
                let t = self.edge_target(e);
                if base.get(t) || scratch.visited.get(t) {
                    continue;
                }
                scratch.visit(t);
                scratch.queue.push_back(t);
                count += 1;
            }
        }
        scratch.reset();
        count
    }
}

/// Reusable per-worker traversal state for [`InfluenceGraph::extend_reach`].
#[derive(Debug, Default)]
pub struct TraversalScratch {
    visited: BitRow,
    touched: Vec<usize>,
    queue: VecDeque<usize>,
}

impl TraversalScratch {
    pub fn new(n: usize) -> Self {
        Self {
            visited: BitRow::with_size(n),
            touched: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    fn ensure(&mut self, n: usize) {
        if self.visited.len() != n {
            self.visited = BitRow::with_size(n);
        }
    }

    #[inline]
    fn visit(&mut self, v: usize) {
        self.visited.set(v);
        self.touched.push(v);
    }

    fn reset(&mut self) {
        for v in self.touched.drain(..) {
            self.visited.unset(v);
        }
        self.queue.clear();
    }
}

/// Immutable compressed-sparse-row graph.
///
/// Edge ids follow CSR order: edges leaving vertex `0` first, in insertion
/// order, then vertex `1`, and so on. An undirected input edge becomes two
/// directed edges with distinct ids.
#[derive(Clone, Debug, Default)]
pub struct CsrGraph {
    offsets: Vec<usize>,
    targets: Vec<usize>,
    weights: Vec<f32>,
}

impl CsrGraph {
    /// Directed graph from `(src, dst)` pairs; all weights are `1.0`.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Self {
        let weighted: Vec<_> = edges.iter().map(|&(u, v)| (u, v, 1.0)).collect();
        Self::from_weighted_edges(n, &weighted, false)
    }

    /// Graph from `(src, dst, weight)` triples. When `undirected` is set each
    /// triple also contributes the reverse edge.
    ///
    /// # Panics
    /// Panics if an endpoint is `>= n`.
    pub fn from_weighted_edges(n: usize, edges: &[(usize, usize, f32)], undirected: bool) -> Self {
        let mut degree = vec![0usize; n + 1];
        for &(u, v, _) in edges {
            assert!(u < n && v < n, "edge ({u}, {v}) out of range for {n} vertices");
            degree[u + 1] += 1;
            if undirected {
                degree[v + 1] += 1;
            }
        }
        for i in 0..n {
            degree[i + 1] += degree[i];
        }
        let offsets = degree;
        let m = offsets[n];
        let mut fill = offsets.clone();
        let mut targets = vec![0usize; m];
        let mut weights = vec![0f32; m];
        let mut place = |src: usize, dst: usize, w: f32| {
            let slot = fill[src];
            targets[slot] = dst;
            weights[slot] = w;
            fill[src] += 1;
        };
        for &(u, v, w) in edges {
            place(u, v, w);
            if undirected {
                place(v, u, w);
            }
        }
        Self {
            offsets,
            targets,
            weights,
        }
    }
}

impl InfluenceGraph for CsrGraph {
    fn num_vertices(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn num_edges(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    fn out_edges(&self, v: usize) -> Range<usize> {
        self.offsets[v]..self.offsets[v + 1]
    }

    #[inline]
    fn edge_target(&self, e: usize) -> usize {
        self.targets[e]
    }

    fn edge_weight(&self, e: usize) -> f32 {
        self.weights[e]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain4() -> CsrGraph {
        CsrGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3)])
    }

    #[test]
    fn csr_layout_follows_source_order() {
        let g = CsrGraph::from_edges(3, &[(2, 0), (0, 1), (0, 2)]);
        assert_eq!(g.num_vertices(), 3);
        assert_eq!(g.num_edges(), 3);
        assert_eq!(g.out_edges(0), 0..2);
        assert_eq!(g.edge_target(0), 1);
        assert_eq!(g.edge_target(1), 2);
        assert_eq!(g.out_edges(2), 2..3);
    }

    #[test]
    fn undirected_doubles_edges() {
        let g = CsrGraph::from_weighted_edges(2, &[(0, 1, 0.5)], true);
        assert_eq!(g.num_edges(), 2);
        assert_eq!(g.edge_target(g.out_edges(1).start), 0);
        assert_eq!(g.edge_weight(0), 0.5);
    }

    #[test]
    fn reach_respects_mask() {
        let g = chain4();
        let all = EdgeMask::full(3);
        assert_eq!(g.reach_from_seeds(&all, &[0]).count_ones(), 4);
        let mut cut = EdgeMask::full(3);
        cut.unset(1); // 1 -> 2 blocked
        let r = g.reach_from_seeds(&cut, &[0]);
        assert_eq!(r.ones().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(g.reach_from_seeds(&all, &[]).count_ones(), 0);
    }

    #[test]
    fn extend_reach_layers_on_base() {
        let g = CsrGraph::from_edges(5, &[(0, 1), (2, 1), (2, 3), (3, 4)]);
        let all = EdgeMask::full(g.num_edges());
        let base = g.reach_from_seeds(&all, &[0]);
        let mut scratch = TraversalScratch::new(5);
        // 2 adds {2, 3, 4}; 1 is already covered.
        assert_eq!(g.extend_reach(&all, 2, &base, 2, &mut scratch), 5);
        // Already covered vertices contribute the base count unchanged.
        assert_eq!(g.extend_reach(&all, 1, &base, 2, &mut scratch), 2);
        // Scratch comes back clean so repeated calls agree.
        assert_eq!(g.extend_reach(&all, 3, &base, 2, &mut scratch), 4);
        assert_eq!(base.count_ones(), 2);
    }
}
