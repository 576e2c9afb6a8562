//! vireo_regalloc: Generic graph-coloring primitives for register allocation.
//!
//! Provides the two target-agnostic leaves of the allocator stack: a
//! decreasing-key binary min-heap ([`DecHeap`]) and a Chaitin-style
//! simplify/select coloring kernel ([`Graph`]). Both operate on plain node
//! indices; the IR-facing driver lives in `vireo_codegen`.

pub mod graph;
pub mod heap;

pub use graph::Graph;
pub use heap::DecHeap;

#[cfg(test)]
mod tests;
