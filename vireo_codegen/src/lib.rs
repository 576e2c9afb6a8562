//! vireo_codegen: register allocation and frame finalization for the vireo
//! IR.
//!
//! The pipeline per function is: graph-coloring allocation with
//! spill-and-retry ([`allocator::allocate`]), the call-overlap scan
//! ([`overlap::scan_overlap`]), and stack-frame layout
//! ([`frame::layout_frame`]). [`finalize`] runs all three over a module.

pub mod allocator;
pub mod frame;
pub mod liveness;
pub mod overlap;

use vireo_ir::Module;

pub use allocator::{allocate, REG_NUM, SAVE_START};
pub use frame::layout_frame;
pub use overlap::scan_overlap;

/// Allocate registers, scan call overlaps, and lay out the frame of every
/// function in the module. Re-running on an already-finalized module is a
/// no-op.
pub fn finalize(module: &mut Module) {
    for func in &mut module.functions {
        allocator::allocate(func);
        overlap::scan_overlap(func);
        frame::layout_frame(func);
    }
}
