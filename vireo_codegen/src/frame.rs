//! Stack-frame layout.
//!
//! Runs after coloring and overlap scanning. Areas are placed bottom-up
//! with padding applied at each boundary: the outgoing-argument area and
//! the reserved extra words, the callee-saved save area, the return-address
//! word (only when calls exist), the PIC restore word, the frame-pointer
//! save, then every still-undetermined slot in insertion order.

use log::debug;

use vireo_ir::mem::SlotStatus;
use vireo_ir::Function;

fn align_up(n: usize) -> usize {
    (n + Function::MASK) & !Function::MASK
}

/// Fix the offset of every frame-resident slot and the total frame size.
/// Marks the function allocated; a second run is a no-op.
pub fn layout_frame(f: &mut Function) {
    if f.allocated {
        return;
    }

    let mut size = 4 * f.sub_argc + Function::EXTRA_STACK;
    size = align_up(size);
    size += 4 * f.save_regs;
    size = align_up(size);

    if f.has_sub {
        f.ra_slot.status = SlotStatus::Assigned;
        f.ra_slot.offset = size;
        size += 4;
    }
    f.pic_slot.status = SlotStatus::Assigned;
    f.pic_slot.offset = size;
    size += 4;
    f.fp_slot.status = SlotStatus::Assigned;
    f.fp_slot.offset = size;
    size += 4;
    size = align_up(size);

    for slot in f.mems.iter_mut() {
        if slot.status == SlotStatus::Undetermined {
            slot.status = SlotStatus::Assigned;
            slot.offset = size;
            size += slot.size;
        }
    }
    size = align_up(size);

    f.stack_size = size;
    f.allocated = true;
    debug!("{}: frame laid out, {} bytes", f.name, f.stack_size);
}
