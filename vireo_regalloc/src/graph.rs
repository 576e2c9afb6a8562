//! Chaitin-style graph coloring over an explicit edge list.
//!
//! The kernel runs the classic simplify/select scheme: repeatedly remove the
//! minimum-degree node (via the decrease-key heap), then color the removal
//! stack in reverse, giving each node the lowest color absent from its
//! already-colored neighbors. Colors are tracked in a 64-bit mask so the
//! lowest free color is a single `trailing_zeros` away.

use crate::heap::DecHeap;

/// Sentinel for a node that has not been assigned a color yet.
const UNCOLORED: usize = usize::MAX;

/// An undirected interference graph over nodes `0..n`.
#[derive(Debug)]
pub struct Graph {
    edges: Vec<(usize, usize)>,
    nodes: usize,
}

impl Graph {
    /// Build a graph from an undirected edge list over `nodes` nodes.
    pub fn new(edges: Vec<(usize, usize)>, nodes: usize) -> Self {
        Self { edges, nodes }
    }

    /// Color the graph with at most `colors` colors.
    ///
    /// On success returns one color per node. Color indices are the lowest
    /// available per node, which biases assignments toward low-numbered
    /// colors. On failure returns every node ordered by descending original
    /// degree; the caller picks a spill victim from the front of that list.
    pub fn color(&self, colors: usize) -> Result<Vec<usize>, Vec<usize>> {
        assert!(colors <= u64::BITS as usize, "color budget exceeds mask width");

        let mut degree = vec![0usize; self.nodes];
        let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); self.nodes];
        for &(a, b) in &self.edges {
            degree[a] += 1;
            degree[b] += 1;
            adjacent[a].push(b);
            adjacent[b].push(a);
        }

        // Simplify: peel minimum-degree nodes onto a stack. A node whose
        // residual degree reaches the budget can never be colored.
        let mut heap = DecHeap::new(&degree);
        let mut order = Vec::with_capacity(self.nodes);
        while let Some((deg, node)) = heap.pop() {
            if deg >= colors {
                let mut info: Vec<usize> = (0..self.nodes).collect();
                info.sort_by(|&a, &b| degree[b].cmp(&degree[a]));
                return Err(info);
            }
            for &n in &adjacent[node] {
                heap.decrease(n, 1);
            }
            order.push(node);
        }

        // Select: unwind the stack, assigning the lowest free color.
        let mut result = vec![UNCOLORED; self.nodes];
        while let Some(node) = order.pop() {
            let mut mask: u64 = 0;
            for &n in &adjacent[node] {
                if result[n] != UNCOLORED {
                    mask |= 1 << result[n];
                }
            }
            result[node] = (!mask).trailing_zeros() as usize;
        }
        Ok(result)
    }
}
