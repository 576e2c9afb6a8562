//! Liveness analysis and interference-web construction.
//!
//! Three DFS passes over the CFG, each guarded by the per-block `visited`
//! flag and restoring it on unwind so the next pass can re-enter:
//!
//! 1. [`collect`] unites phi operands and gathers every colorable register.
//! 2. [`setup_living`] fills each block's `lives` map with the last in-block
//!    use position of each register, or the block length when the register
//!    is live into a successor.
//! 3. [`generate_web`] walks with a running live set and a per-block birth
//!    map, linking every concurrently-live pair whose ranges are not
//!    strictly disjoint within the block.

use std::collections::{HashMap, HashSet};

use vireo_ir::instruction::Inst;
use vireo_ir::{BlockRef, Function, RegId};

/// Unite phi operands and gather every register that needs a color.
pub fn collect(f: &mut Function) -> HashSet<RegId> {
    let mut regs = HashSet::new();
    if let Some(entry) = f.entry_block() {
        collect_block(f, entry, &mut regs);
    }
    regs
}

fn collect_block(f: &mut Function, b: BlockRef, regs: &mut HashSet<RegId>) {
    if f.block(b).visited {
        return;
    }
    f.block_mut(b).visited = true;

    for i in 0..f.block(b).instructions.len() {
        let phi = match &f.block(b).instructions[i] {
            Inst::Phi(x, y) => Some((*x, *y)),
            _ => None,
        };
        if let Some((x, y)) = phi {
            f.regs.unite(x, y);
        }
    }
    for inst in &f.block(b).instructions {
        inst.collect_regs(&f.regs, &f.mems, regs);
    }

    let edges = f.block(b).out_edges.clone();
    for e in edges {
        collect_block(f, e, regs);
    }
    f.block_mut(b).visited = false;
}

/// Fill each block's `lives` map for the given register set.
pub fn setup_living(f: &mut Function, regs: &HashSet<RegId>) {
    if let Some(entry) = f.entry_block() {
        setup_block(f, entry, regs);
    }
}

fn setup_block(f: &mut Function, b: BlockRef, regs: &HashSet<RegId>) {
    if f.block(b).visited {
        return;
    }
    f.block_mut(b).visited = true;

    let edges = f.block(b).out_edges.clone();
    for &e in &edges {
        setup_block(f, e, regs);
    }

    // Live into any successor: live through this whole block.
    let len = f.block(b).instructions.len();
    let mut live_through = Vec::new();
    for &r in regs {
        if edges.iter().any(|&e| f.block(e).lives.contains_key(&r)) {
            live_through.push(r);
        }
    }
    for r in live_through {
        f.block_mut(b).lives.insert(r, len);
    }

    // Last in-block use position of each register.
    let insts = std::mem::take(&mut f.block_mut(b).instructions);
    for &r in regs {
        for (j, inst) in insts.iter().enumerate() {
            if inst.uses(&f.regs, &f.mems, r) {
                let entry = f.block_mut(b).lives.entry(r).or_insert(j);
                *entry = (*entry).max(j);
            }
        }
    }
    f.block_mut(b).instructions = insts;

    f.block_mut(b).visited = false;
}

/// Build the interference web from the `lives` maps.
pub fn generate_web(f: &mut Function) {
    if let Some(entry) = f.entry_block() {
        let mut live = HashSet::new();
        web_block(f, entry, &mut live);
    }
}

/// Record a conflict between `i` and `j`, resolved to roots. Registers born
/// physical impose no constraint on the allocatable pools and are skipped.
fn link(f: &mut Function, i: RegId, j: RegId) {
    let ri = f.regs.find(i);
    let rj = f.regs.find(j);
    if ri == rj {
        return;
    }
    if f.regs.get(ri).allocated || f.regs.get(rj).allocated {
        return;
    }
    f.regs.get_mut(ri).neighbors.insert(rj);
}

fn add_clique(f: &mut Function, live: &HashSet<RegId>) {
    let members: Vec<RegId> = live.iter().copied().collect();
    for &i in &members {
        for &j in &members {
            if i != j {
                link(f, i, j);
            }
        }
    }
}

fn web_block(f: &mut Function, b: BlockRef, live: &mut HashSet<RegId>) {
    if f.block(b).visited {
        // Re-entry through a cycle: close out the live set once more if
        // nothing follows this block.
        if f.block(b).out_edges.is_empty() {
            add_clique(f, live);
        }
        return;
    }
    f.block_mut(b).visited = true;

    // Definitions born in this block.
    let len = f.block(b).instructions.len();
    let mut birth: HashMap<RegId, usize> = HashMap::new();
    for j in 0..len {
        if let Some(d) = f.block(b).instructions[j].def() {
            live.insert(d);
            birth.insert(d, j);
        }
    }

    // Link every concurrently-live pair unless their ranges are strictly
    // disjoint within this block.
    let lives = f.block(b).lives.clone();
    let members: Vec<RegId> = live.iter().copied().collect();
    for &i in &members {
        for &j in &members {
            if i == j {
                continue;
            }
            let disjoint = matches!(
                (lives.get(&i), birth.get(&j)),
                (Some(&li), Some(&bj)) if li < bj
            ) || matches!(
                (lives.get(&j), birth.get(&i)),
                (Some(&lj), Some(&bi)) if lj < bi
            );
            if !disjoint {
                link(f, i, j);
            }
        }
    }

    // Registers that die here leave the live set before the children run.
    for (&r, &pos) in &lives {
        if pos < len {
            live.remove(&r);
        }
    }

    let edges = f.block(b).out_edges.clone();
    for &e in &edges {
        web_block(f, e, live);
    }
    // A leaf closes out everything still live, covering ranges that only
    // meet past the last instruction.
    if edges.is_empty() {
        add_clique(f, live);
    }

    // Restore the live set for the unwind.
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
