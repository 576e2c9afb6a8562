//! Unit tests for the decrease-key heap and the coloring kernel.

use crate::graph::Graph;
use crate::heap::DecHeap;

/// Deterministic xorshift generator so the stress tests need no RNG crate.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

// --- Heap tests ---

#[test]
fn heap_pops_sorted() {
    let keys = [5, 3, 9, 1, 7, 0, 2];
    let mut heap = DecHeap::new(&keys);
    let mut popped = Vec::new();
    while let Some((key, _)) = heap.pop() {
        popped.push(key);
    }
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    assert_eq!(popped, sorted);
}

#[test]
fn heap_tracks_payloads() {
    let keys = [4, 2, 8];
    let mut heap = DecHeap::new(&keys);
    let (key, payload) = heap.pop().unwrap();
    assert_eq!(key, 2);
    assert_eq!(payload, 1);
}

#[test]
fn heap_decrease_reorders() {
    let keys = [10, 20, 30];
    let mut heap = DecHeap::new(&keys);
    heap.decrease(2, 25);
    assert_eq!(heap.pop(), Some((5, 2)));
    assert_eq!(heap.pop(), Some((10, 0)));
    assert_eq!(heap.pop(), Some((20, 1)));
    assert!(heap.is_empty());
}

#[test]
fn heap_decrease_after_pop_is_noop() {
    let keys = [1, 2, 3];
    let mut heap = DecHeap::new(&keys);
    assert_eq!(heap.pop(), Some((1, 0)));
    heap.decrease(0, 100);
    assert_eq!(heap.pop(), Some((2, 1)));
    assert_eq!(heap.pop(), Some((3, 2)));
}

#[test]
fn heap_stress_random_decreases() {
    let mut rng = XorShift(0x9e3779b97f4a7c15);
    let mut keys: Vec<usize> = (0..100_000).map(|_| (rng.next() % 1_000_000) as usize).collect();
    let mut heap = DecHeap::new(&keys);

    for _ in 0..100_000 {
        let n = (rng.next() as usize) % keys.len();
        if keys[n] >= 1000 {
            keys[n] -= 1000;
            heap.decrease(n, 1000);
        }
    }

    let mut popped = Vec::with_capacity(keys.len());
    while let Some((_, payload)) = heap.pop() {
        popped.push(keys[payload]);
    }
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(popped, sorted);
}

// --- Coloring tests ---

fn pentagon_edges() -> Vec<(usize, usize)> {
    vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 4), (3, 4)]
}

#[test]
fn color_five_nodes_with_three_colors() {
    let edges = pentagon_edges();
    let graph = Graph::new(edges.clone(), 5);
    let colors = graph.color(3).expect("3 colors suffice");
    assert_eq!(colors.len(), 5);
    for (a, b) in edges {
        assert_ne!(colors[a], colors[b], "edge ({a}, {b}) shares a color");
    }
}

#[test]
fn color_five_nodes_fails_with_two_colors() {
    let graph = Graph::new(pentagon_edges(), 5);
    let info = graph.color(2).expect_err("2 colors cannot work");
    assert_eq!(info.len(), 5);
    // Nodes 0 and 1 have the maximum degree of 3.
    assert!(info[0] == 0 || info[0] == 1);
}

#[test]
fn color_triangle_uses_three_colors() {
    let graph = Graph::new(vec![(0, 1), (1, 2), (0, 2)], 3);
    let colors = graph.color(3).unwrap();
    let mut sorted = colors.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2]);
}

#[test]
fn color_bounded_by_max_degree() {
    // A path graph: max degree 2, so colors stay within {0, 1, 2} under any
    // budget larger than the degree.
    let edges: Vec<(usize, usize)> = (0..9).map(|i| (i, i + 1)).collect();
    let graph = Graph::new(edges, 10);
    let colors = graph.color(17).unwrap();
    assert!(colors.iter().all(|&c| c <= 2));
}

#[test]
fn color_isolated_nodes_share_lowest_color() {
    let graph = Graph::new(Vec::new(), 4);
    let colors = graph.color(17).unwrap();
    assert_eq!(colors, vec![0, 0, 0, 0]);
}

#[test]
fn color_empty_graph() {
    let graph = Graph::new(Vec::new(), 0);
    assert_eq!(graph.color(17).unwrap(), Vec::<usize>::new());
}

#[test]
fn color_failure_orders_by_degree() {
    // A star: node 0 touches everyone, so it leads the failure list.
    let edges: Vec<(usize, usize)> = (1..6).map(|i| (0, i)).collect();
    let graph = Graph::new(edges, 6);
    let info = graph.color(1).expect_err("star is not 1-colorable");
    assert_eq!(info[0], 0);
}
