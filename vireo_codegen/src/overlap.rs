//! Call-overlap scanning.
//!
//! A call clobbers the caller-saved (`t*`) colors. This pass walks the CFG
//! with the same live-set discipline as the web builder and, for every call
//! site, records which live caller-saved roots actually cross the call —
//! not last-used at or before it, not born at or after it, and not flowing
//! through it as an argument. Each crossing root is assigned a rescue slot;
//! emission wraps the `jal` with a store/reload pair per entry.

use std::collections::{HashMap, HashSet};

use log::trace;

use vireo_ir::instruction::Inst;
use vireo_ir::reg::RegIdent;
use vireo_ir::{BlockRef, Function, RegId};

/// Find and slot every caller-saved register live across a call. Requires
/// the liveness maps left in place by a successful allocation run.
pub fn scan_overlap(f: &mut Function) {
    if f.allocated {
        return;
    }
    if let Some(entry) = f.entry_block() {
        let mut live = HashSet::new();
        scan_block(f, entry, &mut live);
    }
}

fn scan_block(f: &mut Function, b: BlockRef, live: &mut HashSet<RegId>) {
    if f.block(b).visited {
        return;
    }
    f.block_mut(b).visited = true;

    let len = f.block(b).instructions.len();
    let mut birth: HashMap<RegId, usize> = HashMap::new();
    for j in 0..len {
        if let Some(d) = f.block(b).instructions[j].def() {
            live.insert(d);
            birth.insert(d, j);
        }
    }

    let lives = f.block(b).lives.clone();
    for j in 0..len {
        let args = match &f.block(b).instructions[j] {
            Inst::Call(call) => call.args.clone(),
            _ => continue,
        };

        let mut overlaps: Vec<RegId> = Vec::new();
        for &r in live.iter() {
            let root = f.regs.find(r);
            let caller_saved = match f.regs.get(root).ident {
                RegIdent::Physical(name) => name.starts_with('t'),
                RegIdent::Virtual(_) => false,
            };
            if !caller_saved {
                continue;
            }
            let mut interleaved = lives.get(&r).map_or(false, |&p| p <= j)
                || birth.get(&r).map_or(false, |&p| p >= j);
            if !interleaved {
                interleaved = args.iter().any(|&m| f.regs.alias(r, m));
            }
            if !interleaved {
                overlaps.push(root);
            }
        }
        // Stable slot assignment regardless of live-set iteration order.
        overlaps.sort();
        overlaps.dedup();

        for &root in &overlaps {
            if f.regs.get(root).overlap_slot.is_none() {
                let slot = f.new_memory(4);
                f.regs.get_mut(root).overlap_slot = Some(slot);
            }
        }
        if !overlaps.is_empty() {
            trace!(
                "{}: call at {}:{j} crosses {} caller-saved register(s)",
                f.name,
                f.block(b).label,
                overlaps.len()
            );
        }
        if let Inst::Call(call) = &mut f.block_mut(b).instructions[j] {
            call.scanned = true;
            call.overlap_temp.extend(overlaps.iter().copied());
        }
    }

    for (&r, &pos) in &lives {
        if pos < len {
            live.remove(&r);
        }
    }
    let edges = f.block(b).out_edges.clone();
    for e in edges {
        scan_block(f, e, live);
    }
    for (&r, &pos) in &lives {
        if pos < len {
            live.insert(r);
        }
    }
    for &d in birth.keys() {
        live.remove(&d);
    }
    f.block_mut(b).visited = false;
}
