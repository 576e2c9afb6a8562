//! Instruction definitions for the vireo IR.
//!
//! Instructions are a closed tagged sum. Mnemonics are thin tags over a
//! handful of operand families: every member of a family behaves identically
//! for liveness, spilling, and replacement, and differs only in its printed
//! name. Each variant answers four questions for the allocator: which
//! registers it reads, which single register it defines, whether it mentions
//! a given register, and how to rewrite a register in place.

use std::collections::{BTreeSet, HashSet};

use crate::function::BlockRef;
use crate::mem::{MemFile, MemRef, SlotStatus};
use crate::module::FuncDecl;
use crate::reg::{RegFile, RegId};

/// Three-register arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TernaryOp {
    Add,
    Addu,
    Sub,
    Subu,
}

impl TernaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            TernaryOp::Add => "add",
            TernaryOp::Addu => "addu",
            TernaryOp::Sub => "sub",
            TernaryOp::Subu => "subu",
        }
    }
}

/// Two registers and an immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryImmOp {
    Addi,
    Addiu,
}

impl BinaryImmOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryImmOp::Addi => "addi",
            BinaryImmOp::Addiu => "addiu",
        }
    }
}

/// Two-register operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Clo,
    Clz,
    Move,
    Negu,
    Seb,
    Seh,
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Clo => "clo",
            BinaryOp::Clz => "clz",
            BinaryOp::Move => "move",
            BinaryOp::Negu => "negu",
            BinaryOp::Seb => "seb",
            BinaryOp::Seh => "seh",
        }
    }
}

/// Single-register operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Jr,
}

impl UnaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Jr => "jr",
        }
    }
}

/// One register and an immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryImmOp {
    Li,
    Lui,
}

impl UnaryImmOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryImmOp::Li => "li",
            UnaryImmOp::Lui => "lui",
        }
    }
}

/// Word load/store against a stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    Lw,
    Sw,
}

impl MemoryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            MemoryOp::Lw => "lw",
            MemoryOp::Sw => "sw",
        }
    }
}

/// Unconditional jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOp {
    B,
    J,
}

impl JumpOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            JumpOp::B => "b",
            JumpOp::J => "j",
        }
    }
}

/// Single-operand conditional branches against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroBranchOp {
    Beqz,
    Blez,
}

impl ZeroBranchOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ZeroBranchOp::Beqz => "beqz",
            ZeroBranchOp::Blez => "blez",
        }
    }
}

/// Two-operand conditional branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpBranchOp {
    Beq,
    Ble,
    Bge,
}

impl CmpBranchOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CmpBranchOp::Beq => "beq",
            CmpBranchOp::Ble => "ble",
            CmpBranchOp::Bge => "bge",
        }
    }
}

/// A call pseudo-instruction. Expanded at emission into the overlap-save /
/// argument-marshal / `jal` / reload sequence.
#[derive(Debug, Clone)]
pub struct CallInst {
    pub callee: FuncDecl,
    pub args: Vec<RegId>,
    pub ret: Option<RegId>,
    /// Caller-saved roots live across this call, filled by the overlap scan.
    pub overlap_temp: BTreeSet<RegId>,
    /// Set once the overlap scan has seen this site; until then the call
    /// prints as a pseudo-instruction.
    pub scanned: bool,
}

/// An instruction in a basic block.
#[derive(Debug, Clone)]
pub enum Inst {
    Ternary { op: TernaryOp, lhs: RegId, op0: RegId, op1: RegId },
    BinaryImm { op: BinaryImmOp, lhs: RegId, rhs: RegId, imm: i64 },
    Binary { op: BinaryOp, lhs: RegId, rhs: RegId },
    Unary { op: UnaryOp, target: RegId },
    UnaryImm { op: UnaryImmOp, target: RegId, imm: i64 },
    Memory { op: MemoryOp, target: RegId, loc: MemRef },
    /// Register-indexed access: `addu $at, base, index` then the word
    /// access at the slot's offset off `$at`.
    ArrayAccess { op: MemoryOp, target: RegId, index: RegId, loc: MemRef },
    /// Load the address of a stack slot: `addiu target, base, offset`.
    StackAddr { target: RegId, loc: MemRef },
    /// Load the address of a data label: `la target, label`.
    LoadAddr { target: RegId, label: String },
    Unconditional { op: JumpOp, target: BlockRef },
    ZeroBranch { op: ZeroBranchOp, check: RegId, target: BlockRef },
    CmpBranch { op: CmpBranchOp, op0: RegId, op1: RegId, target: BlockRef },
    /// Lifetime-join annotation consumed by the allocator; never emitted.
    Phi(RegId, RegId),
    Call(Box<CallInst>),
    Syscall,
    /// Literal pass-through line.
    Text(String),
}

impl Inst {
    /// The single register this instruction defines, if any.
    pub fn def(&self) -> Option<RegId> {
        match self {
            Inst::Ternary { lhs, .. } => Some(*lhs),
            Inst::BinaryImm { lhs, .. } => Some(*lhs),
            Inst::Binary { lhs, .. } => Some(*lhs),
            Inst::UnaryImm { target, .. } => Some(*target),
            Inst::Memory { op: MemoryOp::Lw, target, .. } => Some(*target),
            Inst::ArrayAccess { op: MemoryOp::Lw, target, .. } => Some(*target),
            Inst::StackAddr { target, .. } => Some(*target),
            Inst::LoadAddr { target, .. } => Some(*target),
            Inst::Call(call) => call.ret,
            Inst::Unary { .. }
            | Inst::Memory { op: MemoryOp::Sw, .. }
            | Inst::ArrayAccess { op: MemoryOp::Sw, .. }
            | Inst::Unconditional { .. }
            | Inst::ZeroBranch { .. }
            | Inst::CmpBranch { .. }
            | Inst::Phi(..)
            | Inst::Syscall
            | Inst::Text(_) => None,
        }
    }

    /// Append every register this instruction reads.
    pub fn reads(&self, mems: &MemFile, out: &mut Vec<RegId>) {
        match self {
            Inst::Ternary { op0, op1, .. } => out.extend([*op0, *op1]),
            Inst::BinaryImm { rhs, .. } | Inst::Binary { rhs, .. } => out.push(*rhs),
            Inst::Unary { target, .. } => out.push(*target),
            Inst::UnaryImm { .. } | Inst::LoadAddr { .. } => {}
            Inst::Memory { op, target, loc } => {
                if *op == MemoryOp::Sw {
                    out.push(*target);
                }
                out.push(mems.get(*loc).base);
            }
            Inst::ArrayAccess { op, target, index, loc } => {
                if *op == MemoryOp::Sw {
                    out.push(*target);
                }
                out.push(*index);
                out.push(mems.get(*loc).base);
            }
            Inst::StackAddr { loc, .. } => out.push(mems.get(*loc).base),
            Inst::ZeroBranch { check, .. } => out.push(*check),
            Inst::CmpBranch { op0, op1, .. } => out.extend([*op0, *op1]),
            Inst::Call(call) => out.extend(call.args.iter().copied()),
            Inst::Unconditional { .. } | Inst::Phi(..) | Inst::Syscall | Inst::Text(_) => {}
        }
    }

    /// Whether this instruction mentions `reg` (read or written), judged by
    /// root equality. Phi nodes mention nothing: they are annotations, not
    /// uses.
    pub fn uses(&self, regs: &RegFile, mems: &MemFile, reg: RegId) -> bool {
        match self {
            Inst::Ternary { lhs, op0, op1, .. } => {
                regs.alias(*lhs, reg) || regs.alias(*op0, reg) || regs.alias(*op1, reg)
            }
            Inst::BinaryImm { lhs, rhs, .. } | Inst::Binary { lhs, rhs, .. } => {
                regs.alias(*lhs, reg) || regs.alias(*rhs, reg)
            }
            Inst::Unary { target, .. } | Inst::UnaryImm { target, .. } => regs.alias(*target, reg),
            Inst::Memory { target, loc, .. } => {
                regs.alias(*target, reg) || regs.alias(mems.get(*loc).base, reg)
            }
            Inst::ArrayAccess { target, index, loc, .. } => {
                regs.alias(*target, reg)
                    || regs.alias(*index, reg)
                    || regs.alias(mems.get(*loc).base, reg)
            }
            Inst::StackAddr { target, loc } => {
                regs.alias(*target, reg) || regs.alias(mems.get(*loc).base, reg)
            }
            Inst::LoadAddr { target, .. } => regs.alias(*target, reg),
            Inst::ZeroBranch { check, .. } => regs.alias(*check, reg),
            Inst::CmpBranch { op0, op1, .. } => regs.alias(*op0, reg) || regs.alias(*op1, reg),
            Inst::Call(call) => {
                call.ret.map_or(false, |r| regs.alias(r, reg))
                    || call.args.iter().any(|&a| regs.alias(a, reg))
            }
            Inst::Unconditional { .. } | Inst::Phi(..) | Inst::Syscall | Inst::Text(_) => false,
        }
    }

    /// Rewrite every operand aliasing `from` to `to` in place. Used by the
    /// spill rewriter.
    pub fn replace(&mut self, regs: &RegFile, mems: &mut MemFile, from: RegId, to: RegId) {
        let swap = |r: &mut RegId| {
            if regs.alias(*r, from) {
                *r = to;
            }
        };
        match self {
            Inst::Ternary { lhs, op0, op1, .. } => {
                swap(lhs);
                swap(op0);
                swap(op1);
            }
            Inst::BinaryImm { lhs, rhs, .. } | Inst::Binary { lhs, rhs, .. } => {
                swap(lhs);
                swap(rhs);
            }
            Inst::Unary { target, .. } | Inst::UnaryImm { target, .. } => swap(target),
            Inst::Memory { target, loc, .. } => {
                swap(target);
                swap(&mut mems.get_mut(*loc).base);
            }
            Inst::ArrayAccess { target, index, loc, .. } => {
                swap(target);
                swap(index);
                swap(&mut mems.get_mut(*loc).base);
            }
            Inst::StackAddr { target, loc } => {
                swap(target);
                swap(&mut mems.get_mut(*loc).base);
            }
            Inst::LoadAddr { target, .. } => swap(target),
            Inst::ZeroBranch { check, .. } => swap(check),
            Inst::CmpBranch { op0, op1, .. } => {
                swap(op0);
                swap(op1);
            }
            Inst::Phi(op0, op1) => {
                swap(op0);
                swap(op1);
            }
            Inst::Call(call) => {
                if let Some(ret) = call.ret.as_mut() {
                    swap(ret);
                }
                for arg in call.args.iter_mut() {
                    swap(arg);
                }
            }
            Inst::Unconditional { .. } | Inst::Syscall | Inst::Text(_) => {}
        }
    }

    /// Accumulate every colorable register this instruction mentions.
    /// Registers born with a physical name are skipped.
    pub fn collect_regs(&self, regs: &RegFile, mems: &MemFile, out: &mut HashSet<RegId>) {
        let push = |set: &mut HashSet<RegId>, r: RegId| {
            if !regs.get(r).allocated {
                set.insert(r);
            }
        };
        match self {
            Inst::Ternary { lhs, op0, op1, .. } => {
                push(out, *lhs);
                push(out, *op0);
                push(out, *op1);
            }
            Inst::BinaryImm { lhs, rhs, .. } | Inst::Binary { lhs, rhs, .. } => {
                push(out, *lhs);
                push(out, *rhs);
            }
            Inst::Unary { target, .. }
            | Inst::UnaryImm { target, .. }
            | Inst::LoadAddr { target, .. } => push(out, *target),
            Inst::Memory { target, loc, .. } => {
                push(out, *target);
                let slot = mems.get(*loc);
                if slot.status == SlotStatus::Static {
                    push(out, slot.base);
                }
            }
            Inst::ArrayAccess { target, index, loc, .. } => {
                push(out, *target);
                push(out, *index);
                let slot = mems.get(*loc);
                if slot.status == SlotStatus::Static {
                    push(out, slot.base);
                }
            }
            Inst::StackAddr { target, .. } => push(out, *target),
            Inst::ZeroBranch { check, .. } => push(out, *check),
            Inst::CmpBranch { op0, op1, .. } => {
                push(out, *op0);
                push(out, *op1);
            }
            Inst::Call(call) => {
                if let Some(ret) = call.ret {
                    push(out, ret);
                }
                for &arg in &call.args {
                    push(out, arg);
                }
            }
            Inst::Unconditional { .. } | Inst::Phi(..) | Inst::Syscall | Inst::Text(_) => {}
        }
    }

    /// Branch target, for CFG consumers.
    pub fn branch_target(&self) -> Option<BlockRef> {
        match self {
            Inst::Unconditional { target, .. }
            | Inst::ZeroBranch { target, .. }
            | Inst::CmpBranch { target, .. } => Some(*target),
            _ => None,
        }
    }
}
