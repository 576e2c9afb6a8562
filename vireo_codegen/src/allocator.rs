//! The allocator driver: build, color, and spill until the web fits.
//!
//! Each round rebuilds liveness and the interference web from scratch,
//! hands the representative subgraph to the coloring kernel, and either
//! commits the coloring or spills the highest-degree unspilled victim and
//! retries. Every retry marks a fresh register as spilled, so the loop is
//! bounded; running out of candidates means the graph is uncolorable even
//! after exhausting spills, which is a bug in the input, not a user error.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use vireo_ir::instruction::{Inst, MemoryOp};
use vireo_ir::mem::MemRef;
use vireo_ir::reg::RegIdent;
use vireo_ir::{BlockRef, Function, RegId};
use vireo_regalloc::Graph;

use crate::liveness;

/// Allocatable colors: `t0..t8` then `s0..s7`.
pub const REG_NUM: usize = 17;
/// First callee-saved color.
pub const SAVE_START: usize = 9;

const TEMP_NAMES: [&str; SAVE_START] = ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8"];
const SAVE_NAMES: [&str; REG_NUM - SAVE_START] = ["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7"];

/// Low colors map to caller-saved temporaries, high colors to callee-saved.
fn color_name(color: usize) -> &'static str {
    if color < SAVE_START {
        TEMP_NAMES[color]
    } else {
        SAVE_NAMES[color - SAVE_START]
    }
}

/// Color every virtual register of `f`, spilling as needed. Also records
/// the count of distinct callee-saved colors in `f.save_regs`.
pub fn allocate(f: &mut Function) {
    if f.allocated {
        return;
    }
    let mut round = 0u32;
    loop {
        round += 1;
        f.clear_liveness();
        let regs = liveness::collect(f);
        liveness::setup_living(f, &regs);
        liveness::generate_web(f);

        // The kernel sees one node per union-find representative, ordered
        // by numeric id so results are stable.
        let mut reps: Vec<RegId> = Vec::new();
        for &r in &regs {
            if f.regs.find(r) == r {
                reps.push(r);
            }
        }
        reps.sort();
        let index: HashMap<RegId, usize> =
            reps.iter().copied().enumerate().map(|(i, r)| (r, i)).collect();

        let mut edges = Vec::new();
        for &r in &reps {
            for &n in &f.regs.get(r).neighbors {
                if n.index() < r.index() {
                    continue;
                }
                let a = index[&r];
                let b = index
                    .get(&n)
                    .copied()
                    .expect("web neighbor is not a representative");
                edges.push((a, b));
            }
        }
        debug!(
            "{}: coloring round {round} over {} registers, {} conflicts",
            f.name,
            reps.len(),
            edges.len()
        );

        match Graph::new(edges, reps.len()).color(REG_NUM) {
            Ok(colors) => {
                let mut saved = BTreeSet::new();
                for (i, &r) in reps.iter().enumerate() {
                    let reg = f.regs.get_mut(r);
                    reg.allocated = true;
                    reg.ident = RegIdent::Physical(color_name(colors[i]));
                    if colors[i] >= SAVE_START {
                        saved.insert(colors[i]);
                    }
                }
                f.save_regs = saved.len();
                debug!("{}: colored, {} callee-saved in use", f.name, f.save_regs);
                return;
            }
            Err(by_degree) => {
                for &r in &reps {
                    f.regs.reset_class(r);
                }
                f.clear_liveness();
                let victim = by_degree
                    .iter()
                    .map(|&i| reps[i])
                    .find(|&r| !f.regs.get(r).spilled);
                let victim = match victim {
                    Some(v) => v,
                    None => panic!(
                        "interference web stays {REG_NUM}-uncolorable with every register spilled"
                    ),
                };
                let slot = f.new_memory(4);
                debug!("{}: spilling {} to a fresh slot", f.name, f.regs.name(victim));
                spill(f, victim, slot);
            }
        }
    }
}

/// Rewrite every use of `victim` to go through `slot`.
///
/// Within a block, consecutive instructions touching the victim share one
/// temporary: a load is prepended only before the first pure use of a run,
/// and a store is appended after any instruction that defines the victim.
pub fn spill(f: &mut Function, victim: RegId, slot: MemRef) {
    if let Some(entry) = f.entry_block() {
        spill_block(f, entry, victim, slot);
    }
}

fn spill_block(f: &mut Function, b: BlockRef, victim: RegId, slot: MemRef) {
    if f.block(b).visited {
        return;
    }
    f.block_mut(b).visited = true;

    let insts = std::mem::take(&mut f.block_mut(b).instructions);
    let mut rewritten = Vec::with_capacity(insts.len() + 2);
    let mut last: Option<RegId> = None;
    for mut inst in insts {
        if inst.uses(&f.regs, &f.mems, victim) {
            let tmp = match last {
                Some(t) => t,
                None => f.regs.create(),
            };
            f.regs.get_mut(tmp).spilled = true;
            let defines = inst.def().map_or(false, |d| f.regs.alias(d, victim));
            if !defines && last.is_none() {
                rewritten.push(Inst::Memory { op: MemoryOp::Lw, target: tmp, loc: slot });
            }
            inst.replace(&f.regs, &mut f.mems, victim, tmp);
            rewritten.push(inst);
            if defines {
                rewritten.push(Inst::Memory { op: MemoryOp::Sw, target: tmp, loc: slot });
            }
            last = Some(tmp);
        } else {
            last = None;
            rewritten.push(inst);
        }
    }
    f.block_mut(b).instructions = rewritten;

    let edges = f.block(b).out_edges.clone();
    for e in edges {
        spill_block(f, e, victim, slot);
    }
    f.block_mut(b).visited = false;
}
